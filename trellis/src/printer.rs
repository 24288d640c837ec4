//! Debug serialization of a retained layout.
//!
//! [`TreePrinter`] walks the actual element graph under a root and emits the
//! declaration text that would reproduce it. Constraint lines are grouped by
//! the same key the normalizer merges on, so attributes sharing a target,
//! relation, constant and multiplier collapse onto one line. Handles not
//! created through the engine are hidden unless requested.
//!
//! ```text
//! root {
//!     child.anchors {
//!         Anchors(.top, .leading, .trailing)
//!         Anchors(.height).equal_to_constant(44.0)
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::anchors::{Attribute, Relation};
use crate::item::{ItemId, ItemRef, LayoutItem, WeakItem};

/// Printer for the element graph under one root.
pub struct TreePrinter {
    root: WeakItem,
    overrides: HashMap<ItemId, String>,
    include_system: bool,
}

impl TreePrinter {
    pub fn new(root: &ItemRef) -> Self {
        Self {
            root: WeakItem::new(root),
            overrides: HashMap::new(),
            include_system: false,
        }
    }

    /// Override the display name used for one element.
    pub fn tag(mut self, item: &ItemRef, name: impl Into<String>) -> Self {
        self.overrides.insert(item.id(), name.into());
        self
    }

    /// Also print platform-generated constraint handles.
    pub fn include_system(mut self) -> Self {
        self.include_system = true;
        self
    }

    /// Produce the declaration text. A released root prints as empty.
    pub fn print(&self) -> String {
        let Some(root) = self.root.upgrade() else {
            return String::new();
        };
        let mut tokens = Vec::new();
        self.collect_tokens(&root, &mut tokens);
        self.describe(&root, &tokens).join("\n")
    }

    fn display_name(&self, item: &ItemRef) -> String {
        if let Some(name) = self.overrides.get(&item.id()) {
            return name.clone();
        }
        item.identifier().unwrap_or_else(|| item.tag())
    }

    fn collect_tokens(&self, item: &ItemRef, tokens: &mut Vec<Token>) {
        let parent_id = item.parent().map(|parent| parent.id());
        for handle in item.installed() {
            if !handle.is_user_created() && !self.include_system {
                continue;
            }
            let resolved = handle.resolved();
            let second_item = resolved.target.as_ref().and_then(WeakItem::upgrade);
            let token = Token {
                first: item.id(),
                attributes: vec![resolved.attribute],
                relation: resolved.relation,
                second: second_item.as_ref().map(|target| self.display_name(target)),
                second_is_parent: second_item
                    .as_ref()
                    .is_some_and(|target| Some(target.id()) == parent_id),
                target_override: (resolved.target_attribute != resolved.attribute)
                    .then_some(resolved.target_attribute),
                constant: resolved.constant,
                multiplier: resolved.multiplier,
            };
            push_merged(tokens, token);
        }
        for child in item.children() {
            self.collect_tokens(&child, tokens);
        }
    }

    fn describe(&self, item: &ItemRef, tokens: &[Token]) -> Vec<String> {
        let name = self.display_name(item);
        let own: Vec<&Token> = tokens.iter().filter(|token| token.first == item.id()).collect();
        let children = item.children();

        let mut lines = Vec::new();
        match (own.is_empty(), children.is_empty()) {
            (true, true) => lines.push(name),
            (false, true) => {
                lines.push(format!("{name}.anchors {{"));
                for token in &own {
                    lines.push(format!("\t{}", token.render()));
                }
                lines.push("}".to_owned());
            }
            (true, false) => {
                lines.push(format!("{name} {{"));
                self.describe_children(&children, tokens, &mut lines);
                lines.push("}".to_owned());
            }
            (false, false) => {
                lines.push(format!("{name}.anchors {{"));
                for token in &own {
                    lines.push(format!("\t{}", token.render()));
                }
                lines.push("}.sublayout {".to_owned());
                self.describe_children(&children, tokens, &mut lines);
                lines.push("}".to_owned());
            }
        }
        lines
    }

    fn describe_children(&self, children: &[ItemRef], tokens: &[Token], lines: &mut Vec<String>) {
        for child in children {
            for line in self.describe(child, tokens) {
                lines.push(format!("\t{line}"));
            }
        }
    }
}

impl fmt::Display for TreePrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print())
    }
}

/// One printed constraint line, possibly merged from several handles.
struct Token {
    first: ItemId,
    attributes: Vec<Attribute>,
    relation: Relation,
    second: Option<String>,
    second_is_parent: bool,
    target_override: Option<Attribute>,
    constant: f64,
    multiplier: f64,
}

impl Token {
    fn merge_key(&self) -> (ItemId, Relation, Option<&String>, bool, Option<Attribute>, u64, u64) {
        (
            self.first,
            self.relation,
            self.second.as_ref(),
            self.second_is_parent,
            self.target_override,
            self.constant.to_bits(),
            self.multiplier.to_bits(),
        )
    }

    fn render(&self) -> String {
        let attrs = self
            .attributes
            .iter()
            .map(|attribute| format!(".{}", attribute.token()))
            .collect::<Vec<_>>()
            .join(", ");
        let mut line = format!("Anchors({attrs})");

        let bare = self.relation == Relation::Equal
            && self.second_is_parent
            && self.target_override.is_none()
            && self.constant == 0.0
            && self.multiplier == 1.0;
        if bare {
            return line;
        }

        match &self.second {
            None => {
                line.push_str(&format!(
                    ".{}({:?})",
                    relation_fn(self.relation, "_constant"),
                    self.constant
                ));
            }
            Some(second) => {
                if self.second_is_parent {
                    line.push_str(&format!(".{}()", relation_fn(self.relation, "_parent")));
                } else {
                    line.push_str(&format!(".{}({second})", relation_fn(self.relation, "")));
                }
                if let Some(attribute) = self.target_override {
                    line.push_str(&format!(".target_attribute(.{})", attribute.token()));
                }
                if self.constant != 0.0 {
                    line.push_str(&format!(".constant({:?})", self.constant));
                }
                if self.multiplier != 1.0 {
                    line.push_str(&format!(".multiplier({:?})", self.multiplier));
                }
            }
        }
        line
    }
}

fn relation_fn(relation: Relation, suffix: &str) -> String {
    let base = match relation {
        Relation::Equal => "equal_to",
        Relation::GreaterOrEqual => "greater_or_equal_to",
        Relation::LessOrEqual => "less_or_equal_to",
    };
    format!("{base}{suffix}")
}

fn push_merged(tokens: &mut Vec<Token>, token: Token) {
    if let Some(existing) = tokens
        .iter_mut()
        .find(|existing| existing.merge_key() == token.merge_key())
    {
        for attribute in token.attributes {
            if !existing.attributes.contains(&attribute) {
                existing.attributes.push(attribute);
            }
        }
        return;
    }
    tokens.push(token);
}
