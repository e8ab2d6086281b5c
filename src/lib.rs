// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含管理接口的数据传输对象
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含任务记录、代理消息和仓库接口
pub mod domain;

/// 基础设施模块
///
/// 提供外部服务集成，如数据库、Redis结果后端、指标导出和内存探针
pub mod infrastructure;

/// 表示层模块
///
/// 处理只读管理接口的HTTP请求和响应
pub mod presentation;

/// 跟踪模块
///
/// 把代理的消息生命周期事件写入任务存储
pub mod tracking;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现后台维护任务
pub mod workers;
