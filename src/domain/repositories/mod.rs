// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 结果后端（result_backend）：读取任务的异步执行结果
/// - 任务仓库（task_repository）：任务记录的写入、查询与清理
pub mod result_backend;
pub mod task_repository;
