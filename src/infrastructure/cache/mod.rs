// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 缓存模块
///
/// 提供Redis客户端以及基于它的任务结果后端
pub mod redis_client;
pub mod redis_result_backend;
