//! 页面脚本
//!
//! 所有注入页面的 JS 片段集中在这里。文本参数一律经 `serde_json::to_string`
//! 转成 JS 字符串字面量，不做任何手工转义。

use serde_json::Value as JsonValue;

/// 打在已定位元素上的属性名，句柄通过它重新解析元素
pub const HANDLE_ATTR: &str = "data-chapter-publish-handle";

/// 页面元素选择器
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub title_field: String,
    pub editor: String,
    pub controls: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            title_field: r#"input[placeholder*="Title" i], input[placeholder*="标题"]"#
                .to_string(),
            editor: r#"textarea, [contenteditable="true"]"#.to_string(),
            controls: r#"button, a, [role="button"]"#.to_string(),
        }
    }
}

/// 写入校验用的规范化：统一换行、压缩行内空白、去掉空行，但保留行的划分
///
/// 编辑器按段落渲染时 innerText 会在段落间多出空行，这里不计较；
/// 正文被压成一段时行数对不上，校验失败并换下一种写入方式。
pub const NORMALIZE_LINES: &str = r"s => (s || '')
                .replace(/\r\n?/g, '\n')
                .split('\n')
                .map(line => line.replace(/[ \t\u00a0]+/g, ' ').trim())
                .filter(line => line.length > 0)
                .join('\n')";

/// 把 Rust 字符串转成 JS 字符串字面量
pub fn js_str(text: &str) -> String {
    JsonValue::String(text.to_string()).to_string()
}

/// 编辑器可交互判断（`el` 已确定存在）
const EDITOR_READY_JS: &str = r#"(el.isConnected
    && !el.disabled && !el.readOnly
    && el.getAttribute('aria-disabled') !== 'true'
    && (el.tagName === 'TEXTAREA' || el.isContentEditable)
    && el.getClientRects().length > 0)"#;

/// 按钮可用判断
const CONTROL_ENABLED_JS: &str =
    r#"(!el.disabled && el.getAttribute('aria-disabled') !== 'true')"#;

/// 按选择器查找第一个元素的表达式
pub fn query_expr(selector: &str) -> String {
    format!("document.querySelector({})", js_str(selector))
}

/// 按文字查找按钮的表达式，与 `ControlQuery::matches` 语义一致
pub fn control_expr(selectors: &PageSelectors, label: &str) -> String {
    format!(
        "Array.from(document.querySelectorAll({})).find(e => (e.textContent || '').trim().toUpperCase().includes({}.trim().toUpperCase()))",
        js_str(&selectors.controls),
        js_str(label)
    )
}

/// 定位元素并打上句柄标记，返回 `{ enabled }` 或 null
pub fn locate(find_expr: &str, handle_id: &str, enabled_check: &str) -> String {
    format!(
        r#"(() => {{
            const el = {find};
            if (!el) return null;
            document.querySelectorAll('[{attr}="{id}"]').forEach(e => e.removeAttribute('{attr}'));
            el.setAttribute('{attr}', '{id}');
            return {{ enabled: {enabled} }};
        }})()"#,
        find = find_expr,
        attr = HANDLE_ATTR,
        id = handle_id,
        enabled = enabled_check,
    )
}

pub fn locate_input(find_expr: &str, handle_id: &str) -> String {
    locate(find_expr, handle_id, "(!el.disabled && !el.readOnly)")
}

pub fn locate_control(find_expr: &str, handle_id: &str) -> String {
    locate(find_expr, handle_id, CONTROL_ENABLED_JS)
}

pub fn locate_editor(find_expr: &str, handle_id: &str) -> String {
    locate(find_expr, handle_id, EDITOR_READY_JS)
}

/// 只判断元素是否存在（不打标记）
pub fn exists(find_expr: &str) -> String {
    format!("(() => !!({}))()", find_expr)
}

/// 编辑器存在且可交互
pub fn editor_ready_by_expr(find_expr: &str) -> String {
    format!(
        "(() => {{ const el = {}; return !!el && {}; }})()",
        find_expr, EDITOR_READY_JS
    )
}

/// 通过句柄判断编辑器是否可交互
pub fn editor_ready_by_handle(handle_id: &str) -> String {
    editor_ready_by_expr(&handle_expr(handle_id))
}

fn handle_expr(handle_id: &str) -> String {
    format!("document.querySelector('[{}=\"{}\"]')", HANDLE_ATTR, handle_id)
}

/// 用原生 setter 写值并派发 input/change 事件，让页面框架感知到变更。
/// 返回 'ok' / 'detached' / 'rejected'
pub fn set_input_value(handle_id: &str, text: &str) -> String {
    format!(
        r#"(() => {{
            const el = {el};
            if (!el) return 'detached';
            const text = {text};
            const proto = el instanceof HTMLTextAreaElement
                ? HTMLTextAreaElement.prototype
                : HTMLInputElement.prototype;
            const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
            el.focus();
            setter.call(el, text);
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            el.blur();
            return el.value === text ? 'ok' : 'rejected';
        }})()"#,
        el = handle_expr(handle_id),
        text = js_str(text),
    )
}

/// 点击元素。返回 'ok' / 'detached' / 'disabled'
pub fn click(handle_id: &str) -> String {
    format!(
        r#"(() => {{
            const el = {el};
            if (!el) return 'detached';
            if ({enabled}) {{ el.click(); return 'ok'; }}
            return 'disabled';
        }})()"#,
        el = handle_expr(handle_id),
        enabled = CONTROL_ENABLED_JS,
    )
}

/// 正文写入方式，按顺序尝试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStrategy {
    /// 全选后 `execCommand('insertText')`，最接近真实输入
    InsertText,
    /// 构造带纯文本的 paste 事件，交给富文本编辑器自己处理
    SyntheticPaste,
    /// 直接写 value / 文本节点并派发 input 事件
    DirectAssign,
}

impl BodyStrategy {
    pub const CHAIN: [BodyStrategy; 3] = [
        BodyStrategy::InsertText,
        BodyStrategy::SyntheticPaste,
        BodyStrategy::DirectAssign,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BodyStrategy::InsertText => "insertText",
            BodyStrategy::SyntheticPaste => "paste",
            BodyStrategy::DirectAssign => "assign",
        }
    }
}

/// 写入正文并校验结果。返回 'ok' / 'detached' / 'failed'
pub fn write_body(strategy: BodyStrategy, handle_id: &str, text: &str) -> String {
    let write = match strategy {
        BodyStrategy::InsertText => {
            r#"
            if (el.tagName === 'TEXTAREA') { el.select(); }
            else { document.getSelection().selectAllChildren(el); }
            document.execCommand('insertText', false, text);"#
        }
        BodyStrategy::SyntheticPaste => {
            r#"
            if (el.tagName === 'TEXTAREA') { el.select(); }
            else { document.getSelection().selectAllChildren(el); }
            const data = new DataTransfer();
            data.setData('text/plain', text);
            el.dispatchEvent(new ClipboardEvent('paste', {
                clipboardData: data, bubbles: true, cancelable: true
            }));"#
        }
        BodyStrategy::DirectAssign => {
            r#"
            if (el.tagName === 'TEXTAREA') {
                const setter = Object.getOwnPropertyDescriptor(HTMLTextAreaElement.prototype, 'value').set;
                setter.call(el, text);
            } else {
                el.replaceChildren(...text.split('\n').map(line => {
                    const p = document.createElement('p');
                    if (line.length) { p.textContent = line; }
                    else { p.appendChild(document.createElement('br')); }
                    return p;
                }));
            }
            el.dispatchEvent(new InputEvent('input', { bubbles: true, inputType: 'insertText' }));"#
        }
    };

    format!(
        r#"(async () => {{
            const el = {el};
            if (!el) return 'detached';
            const text = {text};
            const norm = {normalize};
            try {{
                el.focus();
                {write}
            }} catch (e) {{
                return 'failed';
            }}
            await new Promise(r => setTimeout(r, 50));
            const current = el.tagName === 'TEXTAREA' ? el.value : el.innerText;
            return norm(current) === norm(text) ? 'ok' : 'failed';
        }})()"#,
        el = handle_expr(handle_id),
        text = js_str(text),
        write = write,
        normalize = NORMALIZE_LINES,
    )
}
