// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use html_escape::{encode_double_quoted_attribute, encode_text};
use lol_html::html_content::{ContentType, EndTag};
use lol_html::{element, end, text, HtmlRewriter, Settings};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

use crate::domain::models::fetch::RewrittenDocument;
use crate::domain::models::rule::DomainRule;
use crate::domain::models::url::NormalizedUrl;
use crate::utils::url_utils::{absolutize_reference, ReferenceKind};

/// 内联样式中会被剥离的属性，常用于隐藏正文
const HIDING_PROPERTIES: [&str; 6] = [
    "max-height",
    "height",
    "overflow",
    "position",
    "display",
    "visibility",
];

/// 内容改写错误
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("HTML rewriting failed: {0}")]
    Rewriting(#[from] lol_html::errors::RewritingError),
    #[error("Rewritten HTML is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// 站点标识，用于品牌片段
#[derive(Debug, Clone)]
pub struct SiteIdentity {
    pub name: String,
    pub url: String,
}

/// 内容改写器
///
/// 对获取到的 HTML 依次执行：规范链接替换、相对链接绝对化、域名规则改写、
/// 内联样式清理、追加品牌片段。相同输入和规则总是产生相同输出。
#[derive(Debug, Clone)]
pub struct ContentRewriter {
    site: SiteIdentity,
}

/// 注入内容
struct Injections {
    /// 新的规范链接，插入到 head 开头
    canonical: String,
    /// 规则样式，插入到 head 末尾
    head_style: Option<String>,
    /// 规则脚本和品牌片段，插入到 body 末尾
    tail: String,
}

/// 预扫描结果
#[derive(Debug, Default)]
struct ScanReport {
    has_html: bool,
    has_head: bool,
    /// 内联内容命中移除标记的 script 序号（文档顺序）
    flagged_scripts: HashSet<usize>,
}

impl ContentRewriter {
    pub fn new(site: SiteIdentity) -> Self {
        Self { site }
    }

    /// 改写文档
    ///
    /// # 参数
    ///
    /// * `html` - 原始 HTML
    /// * `url` - 调用方请求的规范化 URL，作为规范链接目标和相对链接基址
    /// * `rule` - 命中的域名规则
    ///
    /// # 返回值
    ///
    /// * `Ok(RewrittenDocument)` - 改写后的文档
    /// * `Err(RewriteError)` - 改写过程中出现的错误
    pub fn rewrite(
        &self,
        html: &str,
        url: &NormalizedUrl,
        rule: Option<&DomainRule>,
    ) -> Result<RewrittenDocument, RewriteError> {
        let markers: &[String] = rule.map(|r| r.script_tag_remove.as_slice()).unwrap_or_default();
        let scan = scan_document(html, markers)?;

        let without_scripts = if markers.is_empty() {
            html.to_string()
        } else {
            remove_marked_scripts(html, markers, &scan.flagged_scripts)?
        };

        let mut injections = Injections {
            canonical: canonical_link(url),
            head_style: None,
            tail: String::new(),
        };
        if let Some(rule) = rule {
            if !rule.custom_style.is_empty() {
                let css: Vec<String> = rule.custom_style.iter().map(|s| s.to_css()).collect();
                injections.head_style = Some(format!(
                    "<style type=\"text/css\">{}</style>",
                    css.join(" ")
                ));
            }
            if let Some(code) = &rule.custom_code {
                injections
                    .tail
                    .push_str(&format!("<script type=\"text/javascript\">{}</script>", code));
            }
        }
        injections.tail.push_str(&self.branding_fragment());

        let html = self.rewrite_document(&without_scripts, url, rule, &scan, injections)?;
        debug!("Rewrote document for {} ({} bytes)", url, html.len());
        Ok(RewrittenDocument { html })
    }

    fn rewrite_document(
        &self,
        html: &str,
        url: &NormalizedUrl,
        rule: Option<&DomainRule>,
        scan: &ScanReport,
        injections: Injections,
    ) -> Result<String, RewriteError> {
        let origin = url.origin();
        let Injections {
            canonical,
            head_style,
            tail,
        } = injections;
        // Taken by whichever handler emits them first; end tags are optional in HTML
        let head_style = Rc::new(RefCell::new(head_style));
        let tail = Rc::new(RefCell::new(Some(tail)));
        let head_seen = Cell::new(false);
        let body_seen = Cell::new(false);
        let html_seen = Cell::new(false);

        let prefix = if !scan.has_html && !scan.has_head {
            let style = head_style.borrow_mut().take().unwrap_or_default();
            Some(format!("<head>{}{}</head>", canonical, style))
        } else {
            None
        };

        let mut output = Vec::with_capacity(html.len() + canonical.len() + 1024);

        let mut handlers = vec![
            element!("link[rel]", |el| {
                let is_canonical = el
                    .get_attribute("rel")
                    .map(|rel| {
                        rel.split_ascii_whitespace()
                            .any(|token| token.eq_ignore_ascii_case("canonical"))
                    })
                    .unwrap_or(false);
                if is_canonical {
                    el.remove();
                }
                Ok(())
            }),
            element!("head", |el| {
                if !head_seen.replace(true) {
                    el.prepend(&canonical, ContentType::Html);
                    if let Some(end_handlers) = el.end_tag_handlers() {
                        let head_style = Rc::clone(&head_style);
                        end_handlers.push(Box::new(move |end: &mut EndTag<'_>| {
                            if let Some(style) = head_style.borrow_mut().take() {
                                end.before(&style, ContentType::Html);
                            }
                            Ok(())
                        }) as _);
                    }
                }
                Ok(())
            }),
            element!("[src]", |el| {
                if let Some(src) = el.get_attribute("src") {
                    if let Some(absolute) = absolutize_reference(&origin, &src, ReferenceKind::Src) {
                        el.set_attribute("src", &absolute)?;
                    }
                }
                Ok(())
            }),
            element!("[href]", |el| {
                if let Some(href) = el.get_attribute("href") {
                    if let Some(absolute) = absolutize_reference(&origin, &href, ReferenceKind::Href)
                    {
                        el.set_attribute("href", &absolute)?;
                    }
                }
                Ok(())
            }),
            element!("[style]", |el| {
                if let Some(style) = el.get_attribute("style") {
                    let cleaned = sanitize_inline_style(&style);
                    if cleaned.is_empty() {
                        el.remove_attribute("style");
                    } else if cleaned != style {
                        el.set_attribute("style", &cleaned)?;
                    }
                }
                Ok(())
            }),
            element!("body", |el| {
                if !body_seen.replace(true) {
                    if let Some(end_handlers) = el.end_tag_handlers() {
                        let tail = Rc::clone(&tail);
                        end_handlers.push(Box::new(move |end: &mut EndTag<'_>| {
                            if let Some(tail) = tail.borrow_mut().take() {
                                end.before(&tail, ContentType::Html);
                            }
                            Ok(())
                        }) as _);
                    }
                }
                Ok(())
            }),
        ];

        if scan.has_html && !scan.has_head {
            handlers.push(element!("html", |el| {
                if !html_seen.replace(true) {
                    let style = head_style.borrow_mut().take().unwrap_or_default();
                    el.prepend(&format!("<head>{}{}</head>", canonical, style), ContentType::Html);
                }
                Ok(())
            }));
        }

        if let Some(rule) = rule.filter(|r| r.has_dom_rewrites()) {
            if !rule.class_element_remove.is_empty() || !rule.class_attr_remove.is_empty() {
                handlers.push(element!("[class]", move |el| {
                    let class = el.get_attribute("class").unwrap_or_default();
                    let tokens: Vec<&str> = class.split_ascii_whitespace().collect();

                    if tokens
                        .iter()
                        .any(|token| rule.class_element_remove.iter().any(|c| c == token))
                    {
                        el.remove();
                        return Ok(());
                    }

                    let kept: Vec<&str> = tokens
                        .iter()
                        .copied()
                        .filter(|token| !rule.class_attr_remove.iter().any(|c| c == token))
                        .collect();
                    if kept.len() != tokens.len() {
                        if kept.is_empty() {
                            el.remove_attribute("class");
                        } else {
                            el.set_attribute("class", &kept.join(" "))?;
                        }
                    }
                    Ok(())
                }));
            }

            if !rule.id_element_remove.is_empty() {
                handlers.push(element!("[id]", move |el| {
                    let id = el.get_attribute("id").unwrap_or_default();
                    if rule.id_element_remove.iter().any(|target| *target == id) {
                        el.remove();
                    }
                    Ok(())
                }));
            }
        }

        // Anything still pending had no end tag to attach to
        let document_handlers = vec![end!(|end| {
            let style = head_style.borrow_mut().take();
            let rest = tail.borrow_mut().take();
            for fragment in style.into_iter().chain(rest) {
                end.append(&fragment, ContentType::Html);
            }
            Ok(())
        })];

        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: handlers,
                document_content_handlers: document_handlers,
                ..Settings::default()
            },
            |c: &[u8]| output.extend_from_slice(c),
        );
        rewriter.write(html.as_bytes())?;
        rewriter.end()?;

        let mut rewritten = String::from_utf8(output)?;
        if let Some(prefix) = prefix {
            rewritten.insert_str(0, &prefix);
        }
        Ok(rewritten)
    }

    /// 追加到 body 末尾的品牌片段
    pub fn branding_fragment(&self) -> String {
        format!(
            concat!(
                "<div data-unwall-branding=\"true\" style=\"z-index: 99999; position: fixed; bottom: 0; right: 4px; ",
                "background: rgb(37,99,235); color: #fff; font-size: 13px; line-height: 1em; padding: 6px; margin: 0px; ",
                "overflow: hidden; border-top-left-radius: 3px; border-top-right-radius: 3px; font-family: Tahoma, sans-serif;\">",
                "Paywall lifted by <a href=\"{}\" style=\"color: #fff; text-decoration: underline; font-weight: bold;\" ",
                "target=\"_blank\">{}</a>!</div>"
            ),
            encode_double_quoted_attribute(&self.site.url),
            encode_text(&self.site.name),
        )
    }
}

fn canonical_link(url: &NormalizedUrl) -> String {
    format!(
        "<link rel=\"canonical\" href=\"{}\">",
        encode_double_quoted_attribute(url.as_str())
    )
}

/// 预扫描：记录文档骨架以及内联内容命中标记的 script
fn scan_document(html: &str, markers: &[String]) -> Result<ScanReport, RewriteError> {
    let has_html = Cell::new(false);
    let has_head = Cell::new(false);
    let script_bodies: RefCell<Vec<String>> = RefCell::new(Vec::new());

    let mut handlers = vec![
        element!("html", |_el| {
            has_html.set(true);
            Ok(())
        }),
        element!("head", |_el| {
            has_head.set(true);
            Ok(())
        }),
    ];
    if !markers.is_empty() {
        handlers.push(element!("script", |_el| {
            script_bodies.borrow_mut().push(String::new());
            Ok(())
        }));
        handlers.push(text!("script", |chunk| {
            if let Some(body) = script_bodies.borrow_mut().last_mut() {
                body.push_str(chunk.as_str());
            }
            Ok(())
        }));
    }

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: handlers,
            ..Settings::default()
        },
        |_: &[u8]| {},
    );
    rewriter.write(html.as_bytes())?;
    rewriter.end()?;

    let flagged_scripts = script_bodies
        .into_inner()
        .iter()
        .enumerate()
        .filter(|(_, body)| markers.iter().any(|m| body.contains(m.as_str())))
        .map(|(index, _)| index)
        .collect();

    Ok(ScanReport {
        has_html: has_html.get(),
        has_head: has_head.get(),
        flagged_scripts,
    })
}

/// 移除 src 或内联内容命中标记的 script，以及预加载脚本的 link
///
/// script 不能嵌套，单独一轮处理保证序号与预扫描一致
fn remove_marked_scripts(
    html: &str,
    markers: &[String],
    flagged: &HashSet<usize>,
) -> Result<String, RewriteError> {
    let index = Cell::new(0usize);
    let mut output = Vec::with_capacity(html.len());
    let matches_marker = |value: &str| markers.iter().any(|m| value.contains(m.as_str()));

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("script", |el| {
                    let current = index.get();
                    index.set(current + 1);
                    let src_matches = el
                        .get_attribute("src")
                        .map(|src| matches_marker(&src))
                        .unwrap_or(false);
                    if src_matches || flagged.contains(&current) {
                        el.remove();
                    }
                    Ok(())
                }),
                element!("link[href]", |el| {
                    let preloads_script = el
                        .get_attribute("as")
                        .map(|value| value.eq_ignore_ascii_case("script"))
                        .unwrap_or(false);
                    let href = el.get_attribute("href").unwrap_or_default();
                    if preloads_script && matches_marker(&href) {
                        el.remove();
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );
    rewriter.write(html.as_bytes())?;
    rewriter.end()?;

    Ok(String::from_utf8(output)?)
}

/// 剥离隐藏类声明，没有声明被剥离时返回 None
fn strip_hiding_declarations(style: &str) -> Option<String> {
    let declarations = split_declarations(style);
    let kept: Vec<&str> = declarations
        .iter()
        .map(|decl| decl.trim())
        .filter(|decl| !decl.is_empty())
        .filter(|decl| !is_hiding_declaration(decl))
        .collect();

    let removed = declarations
        .iter()
        .any(|decl| !decl.trim().is_empty() && is_hiding_declaration(decl.trim()));
    if removed {
        Some(kept.join("; "))
    } else {
        None
    }
}

/// 清理内联样式字符串，没有可剥离的声明时原样返回
pub fn sanitize_inline_style(style: &str) -> String {
    strip_hiding_declarations(style).unwrap_or_else(|| style.to_string())
}

fn is_hiding_declaration(declaration: &str) -> bool {
    match declaration.split_once(':') {
        Some((property, _)) => {
            let property = property.trim().to_ascii_lowercase();
            HIDING_PROPERTIES.contains(&property.as_str())
        }
        None => false,
    }
}

/// 按分号切分声明，忽略括号和引号内的分号
fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in style.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth = (depth - 1).max(0),
                ';' if depth == 0 => {
                    parts.push(&style[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&style[start..]);
    parts
}

#[cfg(test)]
#[path = "content_rewriter_test.rs"]
mod tests;
