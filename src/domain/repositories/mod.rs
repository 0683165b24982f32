// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义规则表和内容缓存的抽象
pub mod content_cache;
pub mod rule_repository;
