// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型
pub mod error_record;
pub mod fetch;
pub mod rule;
pub mod url;
