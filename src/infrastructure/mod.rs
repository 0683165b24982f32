// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod cache;
pub mod error_sink;
pub mod metrics;
pub mod proxy_pool;
pub mod repositories;
