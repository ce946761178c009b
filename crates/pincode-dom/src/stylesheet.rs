//! Nested style rules and scoped `<style>` injection.

use std::fmt::Write as _;

use crate::document::Document;
use crate::error::DomError;
use crate::NodeId;

/// A declaration value or a nested rule block.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    /// A CSS value such as `"1px solid #ccc"`.
    Value(String),
    /// Rules nested under a selector fragment.
    Rules(StyleRules),
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        Self::Value(value.to_owned())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

impl From<i32> for StyleValue {
    fn from(value: i32) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<i64> for StyleValue {
    fn from(value: i64) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<StyleRules> for StyleValue {
    fn from(value: StyleRules) -> Self {
        Self::Rules(value)
    }
}

/// Ordered mapping from selectors (or property names) to values.
///
/// At the top level keys are selectors. Inside a block, scalar entries are
/// declarations and [`StyleValue::Rules`] entries are nested blocks:
///
/// - a key starting with `&` attaches to the parent selector without the `&`
///   (`"&.pincode-focus"`),
/// - a key starting with `:` attaches directly (`":hover"`),
/// - any other key becomes a descendant (`"span"`).
///
/// Property names may be written in camelCase; they are emitted in kebab-case.
///
/// ```
/// use pincode_dom::StyleRules;
///
/// let rules = StyleRules::new().with(
///     ".pincode-grid",
///     StyleRules::new()
///         .with("borderColor", "#999")
///         .with("&.pincode-focus", StyleRules::new().with("borderColor", "blue")),
/// );
/// assert_eq!(
///     rules.to_css(),
///     ".pincode-grid{border-color:#999;}\n.pincode-grid.pincode-focus{border-color:blue;}\n"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleRules {
    entries: Vec<(String, StyleValue)>,
}

impl StyleRules {
    /// An empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing an existing entry in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<StyleValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Deep-merge `other` into `self`. Nested blocks merge key by key; any
    /// other collision is won by `other`.
    pub fn merge(&mut self, other: &StyleRules) {
        for (key, value) in &other.entries {
            let existing = self.entries.iter_mut().find(|(k, _)| k == key);
            match (existing, value) {
                (Some((_, StyleValue::Rules(mine))), StyleValue::Rules(theirs)) => {
                    mine.merge(theirs);
                }
                (Some((_, slot)), _) => *slot = value.clone(),
                (None, _) => self.entries.push((key.clone(), value.clone())),
            }
        }
    }

    /// Flatten into CSS text, one rule per line. Top-level scalars and blocks
    /// without declarations produce no output.
    pub fn to_css(&self) -> String {
        let mut out = String::new();
        for (selector, value) in &self.entries {
            if let StyleValue::Rules(block) = value {
                block.write_block(selector, &mut out);
            }
        }
        out
    }

    fn write_block(&self, selector: &str, out: &mut String) {
        let declarations: String = self
            .entries
            .iter()
            .filter_map(|(property, value)| match value {
                StyleValue::Value(v) => Some(format!("{}:{v};", kebab_case(property))),
                StyleValue::Rules(_) => None,
            })
            .collect();
        if !declarations.is_empty() {
            let _ = writeln!(out, "{selector}{{{declarations}}}");
        }
        for (key, value) in &self.entries {
            if let StyleValue::Rules(nested) = value {
                nested.write_block(&nest_selector(selector, key), out);
            }
        }
    }
}

impl<K: Into<String>, V: Into<StyleValue>> FromIterator<(K, V)> for StyleRules {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut rules = Self::new();
        for (key, value) in iter {
            rules.insert(key, value);
        }
        rules
    }
}

fn nest_selector(parent: &str, key: &str) -> String {
    if let Some(rest) = key.strip_prefix('&') {
        format!("{parent}{rest}")
    } else if key.starts_with(':') {
        format!("{parent}{key}")
    } else {
        format!("{parent} {key}")
    }
}

fn kebab_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Writes [`StyleRules`] into `<style>` elements in the document head.
///
/// Each injected element gets the id `{id_prefix}{scope}` so it can be found
/// and removed again. With a replace rule, every whole-class occurrence of
/// `from` in a selector is rewritten to `{to}{scope}`, which scopes shared
/// rules to one widget instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetInjector {
    id_prefix: String,
    replace: Option<(String, String)>,
}

impl StylesheetInjector {
    /// Injector writing `<style id="{id_prefix}{scope}">`.
    pub fn new(id_prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: id_prefix.into(),
            replace: None,
        }
    }

    /// Rewrite `from` to `{to}{scope}` in every selector.
    pub fn with_replace_rule(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.replace = Some((from.into(), to.into()));
        self
    }

    /// The id given to the `<style>` element for `scope`.
    pub fn style_id(&self, scope: &str) -> String {
        format!("{}{scope}", self.id_prefix)
    }

    /// CSS text for `rules` with the replace rule applied.
    pub fn css(&self, rules: &StyleRules, scope: &str) -> String {
        let Some((from, to)) = &self.replace else {
            return rules.to_css();
        };
        let scoped: StyleRules = rules
            .iter()
            .map(|(selector, value)| (rewrite_class(selector, from, &format!("{to}{scope}")), value.clone()))
            .collect();
        scoped.to_css()
    }

    /// Append a `<style>` element for `scope` to the head, replacing any
    /// earlier one for the same scope.
    pub fn inject(
        &self,
        doc: &mut Document,
        rules: &StyleRules,
        scope: &str,
    ) -> Result<NodeId, DomError> {
        self.remove(doc, scope);
        let id = self.style_id(scope);
        let style = doc.create_element_with("style", &[("id", id.as_str())]);
        doc.set_text(style, &self.css(rules, scope))?;
        doc.append_child(doc.head(), style)?;
        tracing::debug!(id = %id, "injected stylesheet");
        Ok(style)
    }

    /// Remove the `<style>` element for `scope`. Returns whether one existed.
    pub fn remove(&self, doc: &mut Document, scope: &str) -> bool {
        let Some(style) = doc.get_element_by_id(&self.style_id(scope)) else {
            return false;
        };
        doc.remove(style).is_ok()
    }
}

/// Replace occurrences of `from` that are not followed by more identifier
/// characters, so `.pincodeInput` does not match `.pincodeInputs`.
fn rewrite_class(selector: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return selector.to_owned();
    }
    let mut out = String::with_capacity(selector.len());
    let mut rest = selector;
    while let Some(at) = rest.find(from) {
        let after = &rest[at + from.len()..];
        let whole = !after
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_');
        out.push_str(&rest[..at]);
        out.push_str(if whole { to } else { from });
        rest = after;
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn injector() -> StylesheetInjector {
        StylesheetInjector::new("pincodeInput-style-")
            .with_replace_rule(".pincodeInput", ".pincodeInput-")
    }

    #[test]
    fn camel_case_properties_become_kebab_case() {
        let rules = StyleRules::new().with(
            ".pincode",
            StyleRules::new().with("gridTemplateColumns", "repeat(6, 1fr)").with("gap", "4px"),
        );
        assert_eq!(rules.to_css(), ".pincode{grid-template-columns:repeat(6, 1fr);gap:4px;}\n");
    }

    #[test]
    fn nesting_rules() {
        let rules = StyleRules::new().with(
            ".pincode-grid",
            StyleRules::new()
                .with("span", StyleRules::new().with("color", "red"))
                .with(":hover", StyleRules::new().with("color", "blue"))
                .with("&.pincode-focus", StyleRules::new().with("color", "green")),
        );
        assert_eq!(
            rules.to_css(),
            ".pincode-grid span{color:red;}\n\
             .pincode-grid:hover{color:blue;}\n\
             .pincode-grid.pincode-focus{color:green;}\n"
        );
    }

    #[test]
    fn top_level_scalars_are_ignored() {
        let rules = StyleRules::new().with("color", "red");
        assert_eq!(rules.to_css(), "");
    }

    #[test]
    fn merge_is_deep() {
        let mut base = StyleRules::new().with(
            ".pincode-grid",
            StyleRules::new().with("color", "red").with("width", "2em"),
        );
        base.merge(&StyleRules::new().with(
            ".pincode-grid",
            StyleRules::new().with("color", "blue"),
        ));
        let Some(StyleValue::Rules(grid)) = base.get(".pincode-grid") else {
            panic!("expected a rule block");
        };
        assert_eq!(grid.get("color"), Some(&StyleValue::from("blue")));
        assert_eq!(grid.get("width"), Some(&StyleValue::from("2em")));
    }

    #[test]
    fn replace_rule_scopes_selectors() {
        let rules = StyleRules::new()
            .with(".pincodeInput .pincode-grid", StyleRules::new().with("color", "red"))
            .with(".pincodeInputs", StyleRules::new().with("color", "blue"));
        assert_eq!(
            injector().css(&rules, "3"),
            ".pincodeInput-3 .pincode-grid{color:red;}\n.pincodeInputs{color:blue;}\n"
        );
    }

    #[test]
    fn inject_and_remove() {
        let mut doc = Document::new();
        let rules = StyleRules::new().with(".pincodeInput", StyleRules::new().with("display", "flex"));
        let style = injector().inject(&mut doc, &rules, "1").unwrap();
        assert_eq!(doc.parent(style), Some(doc.head()));
        assert_eq!(doc.attribute(style, "id"), Some("pincodeInput-style-1"));
        assert_eq!(doc.text(style), ".pincodeInput-1{display:flex;}\n");

        let again = injector().inject(&mut doc, &rules, "1").unwrap();
        assert_eq!(doc.children(doc.head()), &[again]);

        assert!(injector().remove(&mut doc, "1"));
        assert!(!injector().remove(&mut doc, "1"));
        assert!(doc.children(doc.head()).is_empty());
    }
}
