// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含获取管线、域名策略、错误分类和内容改写
pub mod content_rewriter;
pub mod domain_policy;
pub mod error_classifier;
pub mod retrieval_service;
