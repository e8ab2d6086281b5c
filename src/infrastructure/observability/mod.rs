// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 可观测性模块
///
/// 提供进程级的资源读取，目前为常驻内存探针
pub mod process_memory;
