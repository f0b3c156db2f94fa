//! Selection controller: current symbol / bar size and the derived options.
//!
//! Pure state. Changing the symbol always clears the bar size, and a bar size
//! is only accepted if the current symbol offers it.

use std::sync::Arc;

use crate::models::catalog::Catalog;

#[derive(Debug, Clone)]
pub struct SelectionController {
    catalog: Arc<Catalog>,
    symbol: Option<String>,
    bar_size: Option<String>,
    available: Vec<String>,
}

/// Treats `""` as the unset sentinel.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl SelectionController {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            symbol: None,
            bar_size: None,
            available: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selected_symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn selected_bar_size(&self) -> Option<&str> {
        self.bar_size.as_deref()
    }

    /// Bar sizes offered for the selected symbol.
    pub fn available_bar_sizes(&self) -> &[String] {
        &self.available
    }

    /// Options for the symbol selector, in catalog order. The unset option is
    /// implied and selected with `set_symbol(None)`.
    pub fn symbol_options(&self) -> impl Iterator<Item = &str> {
        self.catalog.symbols()
    }

    /// The bar-size selector is only shown when it has options.
    pub fn bar_size_selector_visible(&self) -> bool {
        !self.available.is_empty()
    }

    /// Both halves of the selection, when both are set.
    pub fn complete_selection(&self) -> Option<(&str, &str)> {
        Some((self.symbol.as_deref()?, self.bar_size.as_deref()?))
    }

    /// Select a symbol (or unset it with `None` / `""`).
    ///
    /// Always clears the bar size, even when the new symbol offers the same
    /// label, and recomputes the available bar sizes.
    pub fn set_symbol(&mut self, symbol: Option<&str>) {
        let symbol = non_empty(symbol);
        self.bar_size = None;
        self.available = symbol
            .map(|s| self.catalog.bar_sizes(s).to_vec())
            .unwrap_or_default();
        self.symbol = symbol.map(str::to_string);
    }

    /// Select a bar size (or unset it with `None` / `""`).
    ///
    /// Labels the current symbol does not offer are ignored. Returns whether
    /// the selection was applied.
    pub fn set_bar_size(&mut self, bar_size: Option<&str>) -> bool {
        match non_empty(bar_size) {
            None => {
                self.bar_size = None;
                true
            }
            Some(label) if self.available.iter().any(|a| a == label) => {
                self.bar_size = Some(label.to_string());
                true
            }
            Some(_) => false,
        }
    }
}
