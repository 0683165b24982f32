// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::net::{IpAddr, SocketAddr};
use tracing::warn;

/// 使用指定 DNS 服务器的解析器
#[derive(Clone)]
pub struct NameserverResolver {
    resolver: TokioAsyncResolver,
}

impl NameserverResolver {
    /// 从地址字符串构建，无法解析的地址会被跳过
    ///
    /// # 返回值
    ///
    /// 没有可用地址时返回 None，调用方回退到系统解析
    pub fn from_servers(servers: &[String]) -> Option<Self> {
        let ips: Vec<IpAddr> = servers
            .iter()
            .filter_map(|s| match s.trim().parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    warn!("Ignoring invalid DNS server address: {}", s);
                    None
                }
            })
            .collect();
        if ips.is_empty() {
            return None;
        }

        let config = ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&ips, 53, true),
        );
        Some(Self {
            resolver: TokioAsyncResolver::tokio(config, ResolverOpts::default()),
        })
    }
}

impl Resolve for NameserverResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.resolver.clone();
        Box::pin(async move {
            let lookup = resolver.lookup_ip(name.as_str()).await?;
            let addrs: Vec<SocketAddr> = lookup.iter().map(|ip| SocketAddr::new(ip, 0)).collect();
            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}
