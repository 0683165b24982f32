// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::domain::models::rule::QueryMod;

static SCHEME_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)https?://").expect("valid scheme regex"));

static COLLAPSED_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(https?):/+").expect("valid collapsed scheme regex"));

/// 被改写的属性类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Src,
    Href,
}

/// 将相对引用改写为 `origin + "/" + 去掉前导斜杠的值`
///
/// 已带 scheme 的值（含 data:、mailto:、tel:、javascript:）、协议相对地址、
/// 页内锚点和空值保持不变，返回 None。
pub fn absolutize_reference(origin: &str, value: &str, kind: ReferenceKind) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") {
        return None;
    }
    if kind == ReferenceKind::Href && trimmed.starts_with('#') {
        return None;
    }
    if Url::parse(trimmed).is_ok() {
        return None;
    }
    Some(format!("{}/{}", origin, trimmed.trim_start_matches('/')))
}

/// 去掉 http:// 或 https:// 前缀
pub fn strip_scheme(url: &str) -> &str {
    match SCHEME_PREFIX.find(url) {
        Some(m) => &url[m.end()..],
        None => url,
    }
}

/// 覆盖或追加查询参数，其余部分保持不变
pub fn apply_query_mods(url: &Url, mods: &[QueryMod]) -> Url {
    if mods.is_empty() {
        return url.clone();
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    for m in mods {
        match pairs.iter_mut().find(|(k, _)| *k == m.key) {
            Some(pair) => pair.1 = m.value.clone(),
            None => pairs.push((m.key.clone(), m.value.clone())),
        }
    }

    let mut modified = url.clone();
    modified.query_pairs_mut().clear().extend_pairs(pairs);
    modified
}

/// 修复路径参数中被合并的斜杠，如 `https:/example.com` -> `https://example.com`
///
/// 缺少 scheme 时补上 https://
pub fn repair_path_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('/');
    if COLLAPSED_SCHEME.is_match(trimmed) {
        COLLAPSED_SCHEME.replace(trimmed, "$1://").into_owned()
    } else {
        format!("https://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://www.example.com";

    #[test]
    fn test_absolutize_root_and_relative_paths() {
        assert_eq!(
            absolutize_reference(ORIGIN, "/img/a.png", ReferenceKind::Src).as_deref(),
            Some("https://www.example.com/img/a.png")
        );
        assert_eq!(
            absolutize_reference(ORIGIN, "page.html", ReferenceKind::Href).as_deref(),
            Some("https://www.example.com/page.html")
        );
    }

    #[test]
    fn test_absolutize_skips_special_references() {
        for value in [
            "data:image/png;base64,AAAA",
            "mailto:a@b.c",
            "tel:+123",
            "javascript:void(0)",
            "https://other.example/x",
            "//cdn.example/x.js",
            "",
            "   ",
        ] {
            assert_eq!(absolutize_reference(ORIGIN, value, ReferenceKind::Href), None);
        }
        assert_eq!(absolutize_reference(ORIGIN, "#top", ReferenceKind::Href), None);
    }

    #[test]
    fn test_strip_scheme() {
        assert_eq!(strip_scheme("https://example.com/a"), "example.com/a");
        assert_eq!(strip_scheme("HTTP://example.com"), "example.com");
        assert_eq!(strip_scheme("example.com"), "example.com");
    }

    #[test]
    fn test_apply_query_mods_overrides_and_appends() {
        let url = Url::parse("https://example.com/a?x=1&amp=0#frag").unwrap();
        let mods = vec![
            QueryMod {
                key: "amp".to_string(),
                value: "1".to_string(),
            },
            QueryMod {
                key: "outputType".to_string(),
                value: "amp".to_string(),
            },
        ];
        let modified = apply_query_mods(&url, &mods);
        assert_eq!(
            modified.as_str(),
            "https://example.com/a?x=1&amp=1&outputType=amp#frag"
        );
    }

    #[test]
    fn test_apply_query_mods_without_mods_is_identity() {
        let url = Url::parse("https://example.com/a").unwrap();
        assert_eq!(apply_query_mods(&url, &[]), url);
    }

    #[test]
    fn test_repair_path_url() {
        assert_eq!(repair_path_url("https:/example.com/a"), "https://example.com/a");
        assert_eq!(repair_path_url("http://example.com"), "http://example.com");
        assert_eq!(repair_path_url("example.com/a"), "https://example.com/a");
        assert_eq!(repair_path_url("/https:/example.com"), "https://example.com");
    }
}
