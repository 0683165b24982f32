// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;

/// 域名规则
///
/// 按主机名配置的请求定制和内容改写规则。所有字段可选，缺省即不生效。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainRule {
    /// 覆盖的请求头
    pub headers: BTreeMap<String, String>,
    /// 覆盖的 Cookie，值为 null 时删除该 Cookie
    pub cookies: BTreeMap<String, Option<String>>,
    /// 是否通过代理池请求
    pub proxy: bool,
    /// URL 修改
    pub url_mods: Option<UrlMods>,
    /// 注入的样式，按声明顺序保留
    #[serde(deserialize_with = "ordered_style_rules")]
    pub custom_style: Vec<StyleRule>,
    /// 注入的脚本
    pub custom_code: Option<String>,
    /// 从 class 属性中移除的类名
    pub class_attr_remove: Vec<String>,
    /// 按 id 移除的元素
    pub id_element_remove: Vec<String>,
    /// 按类名移除的元素
    pub class_element_remove: Vec<String>,
    /// script/link 移除标记
    pub script_tag_remove: Vec<String>,
    /// 是否伪装成搜索引擎爬虫
    #[serde(alias = "fromGoogleBot", alias = "from_googlebot")]
    pub bot_identity: bool,
}

impl DomainRule {
    /// 是否包含任何 DOM 改写指令
    pub fn has_dom_rewrites(&self) -> bool {
        !self.custom_style.is_empty()
            || self.custom_code.is_some()
            || !self.class_attr_remove.is_empty()
            || !self.id_element_remove.is_empty()
            || !self.class_element_remove.is_empty()
            || !self.script_tag_remove.is_empty()
    }

    /// 需要覆盖的查询参数
    pub fn query_mods(&self) -> &[QueryMod] {
        self.url_mods
            .as_ref()
            .map(|mods| mods.query.as_slice())
            .unwrap_or_default()
    }
}

/// URL 修改规则
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UrlMods {
    /// 覆盖或追加的查询参数
    pub query: Vec<QueryMod>,
}

/// 单个查询参数覆盖
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryMod {
    pub key: String,
    pub value: String,
}

/// 一个选择器及其样式声明
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selector: String,
    pub declarations: Vec<String>,
}

impl StyleRule {
    /// 渲染为 `selector { a; b }` 形式
    pub fn to_css(&self) -> String {
        format!("{} {{ {} }}", self.selector, self.declarations.join("; "))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Declarations {
    One(String),
    Many(Vec<String>),
}

fn ordered_style_rules<'de, D>(deserializer: D) -> Result<Vec<StyleRule>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StyleVisitor;

    impl<'de> Visitor<'de> for StyleVisitor {
        type Value = Vec<StyleRule>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of CSS selector to declaration(s)")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut rules = Vec::new();
            while let Some((selector, declarations)) = map.next_entry::<String, Declarations>()? {
                let declarations = match declarations {
                    Declarations::One(d) => vec![d],
                    Declarations::Many(d) => d,
                };
                rules.push(StyleRule {
                    selector,
                    declarations,
                });
            }
            Ok(rules)
        }
    }

    deserializer.deserialize_map(StyleVisitor)
}
