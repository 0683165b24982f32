// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Mutex;
use tracing::{error, warn};

use crate::domain::models::error_record::{ErrorKind, ErrorRecord};

/// 错误记录去向
pub trait ErrorSink: Send + Sync {
    fn record(&self, record: &ErrorRecord);
}

/// 写入结构化日志
#[derive(Debug, Default, Clone)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn record(&self, record: &ErrorRecord) {
        metrics::counter!("unwall_retrieval_errors_total", "kind" => record.kind.code()).increment(1);
        match record.kind {
            // Caller mistakes and policy refusals are expected traffic
            ErrorKind::InvalidUrl | ErrorKind::BlockedDomain | ErrorKind::DmcaDomain => warn!(
                kind = record.kind.code(),
                url = %record.url,
                detail = record.detail.as_deref().unwrap_or_default(),
                timestamp = %record.timestamp.to_rfc3339(),
                "{}",
                record.message
            ),
            _ => error!(
                kind = record.kind.code(),
                url = %record.url,
                detail = record.detail.as_deref().unwrap_or_default(),
                timestamp = %record.timestamp.to_rfc3339(),
                "{}",
                record.message
            ),
        }
    }
}

/// 收集到内存，测试使用
#[derive(Debug, Default)]
pub struct MemoryErrorSink {
    records: Mutex<Vec<ErrorRecord>>,
}

impl MemoryErrorSink {
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl ErrorSink for MemoryErrorSink {
    fn record(&self, record: &ErrorRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}
