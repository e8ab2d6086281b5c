// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，负责与数据库、Redis、
/// Prometheus导出器以及操作系统的交互。
///
/// 包含的子模块：
/// - 缓存（cache）：Redis客户端与任务结果后端
/// - 数据库（database）：数据库连接和实体映射
/// - 指标（metrics）：Prometheus导出器初始化
/// - 可观测性（observability）：进程常驻内存探针
/// - 仓库实现（repositories）：任务仓库的SeaORM实现
///
/// 基础设施层遵循依赖倒置原则，依赖于领域层的抽象接口。
pub mod cache;
pub mod database;
pub mod metrics;
pub mod observability;
pub mod repositories;
