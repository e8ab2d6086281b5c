// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 参数（argument）：任务参数值及其规范化序列化
/// - 消息（message）：外部代理提交的消息及其编解码
/// - 任务（task）：按消息ID保存的生命周期记录
pub mod argument;
pub mod message;
pub mod task;
