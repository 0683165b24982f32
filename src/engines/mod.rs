// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 获取引擎模块
///
/// 直接请求、存档和无头浏览器三个层级，以及按顺序调度它们的编排器
pub mod archive_engine;
pub mod direct_engine;
pub mod dns;
pub mod headless;
pub mod http_client;
pub mod orchestrator;
pub mod redirect_probe;
pub mod request_customizer;
pub mod traits;
pub mod user_agents;
