// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::rule::DomainRule;

/// 域名规则仓库特质
///
/// 启动时加载一次的只读规则表。查找是纯函数：相同输入永远返回相同结果，
/// 不做通配或继承匹配。
pub trait RuleRepository: Send + Sync {
    /// 按域名查找规则
    ///
    /// # 参数
    ///
    /// * `domain` - 主机名，大小写和前导 "www." 由实现统一处理
    ///
    /// # 返回值
    ///
    /// 命中的规则，未配置时返回 None
    fn lookup(&self, domain: &str) -> Option<&DomainRule>;
}
