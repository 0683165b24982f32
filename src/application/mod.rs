// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 负责按配置装配获取管线，并定义对外传输的数据结构
pub mod bootstrap;
pub mod dto;
