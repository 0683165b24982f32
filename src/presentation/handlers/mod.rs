// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// HTTP请求处理器模块
///
/// 交互入口返回改写后的页面，API 入口返回 JSON
pub mod retrieve_handler;
