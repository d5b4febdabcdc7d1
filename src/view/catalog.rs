//! Product list reconciliation
//!
//! Every fetch replaces the whole list, so a refresh landing while the user
//! edits a bid would wipe the edit. Two things prevent that: an unchanged
//! catalog (same fingerprint) is not touched at all, and a changed one carries
//! over every input's value, selection and focus by key.
use serde::Serialize;
use std::collections::HashMap;

use super::{bid_input_key, is_bid_input, InputKey, InputKeyRef, Selection};
use crate::auction::Product;

pub const EMPTY_CATALOG_MESSAGE: &str = "No products available. Add some products to start bidding!";

/// Content hash of a catalog snapshot
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
    pub fn of(products: &[Product]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(products.len() as u64).to_le_bytes());
        for product in products {
            for text in [&product.name, &product.seller] {
                // length prefix keeps ("ab", "c") apart from ("a", "bc")
                hasher.update(&(text.len() as u64).to_le_bytes());
                hasher.update(text.as_bytes());
            }
            hasher.update(&product.initial_price.to_bits().to_le_bytes());
            hasher.update(&product.current_price.to_bits().to_le_bytes());
        }
        Self(hasher.finalize())
    }
}

/// A numeric bid field
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NumberInput {
    pub key: InputKey,
    pub value: String,
    pub selection: Selection,
}

impl NumberInput {
    pub fn new(key: InputKey) -> Self {
        Self {
            key,
            value: String::new(),
            selection: Selection::default(),
        }
    }

    pub fn set_value(&mut self, value: String, selection: Option<Selection>) {
        let len = value.chars().count();
        self.value = value;
        self.selection = selection.unwrap_or(Selection::caret(len)).clamp(len);
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.selection = Selection::default();
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductCard {
    pub product: Product,
    pub bid_input: NumberInput,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", content = "products", rename_all = "snake_case")]
pub enum CatalogView {
    /// Nothing fetched yet
    NotLoaded,
    Empty,
    Products(Vec<ProductCard>),
}

#[derive(Clone, Debug, Serialize)]
pub struct Catalog {
    view: CatalogView,
    #[serde(skip)]
    fingerprint: Option<Fingerprint>,
    /// Bumped on every rebuild
    generation: u64,
}

struct SavedInput {
    value: String,
    selection: Selection,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            view: CatalogView::NotLoaded,
            fingerprint: None,
            generation: 0,
        }
    }

    pub fn view(&self) -> &CatalogView {
        &self.view
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cards(&self) -> &[ProductCard] {
        match &self.view {
            CatalogView::Products(cards) => cards,
            _ => &[],
        }
    }

    pub fn input(&self, key: InputKeyRef) -> Option<&NumberInput> {
        self.cards()
            .iter()
            .map(|card| &card.bid_input)
            .find(|input| input.key == key)
    }

    pub fn input_mut(&mut self, key: InputKeyRef) -> Option<&mut NumberInput> {
        match &mut self.view {
            CatalogView::Products(cards) => cards
                .iter_mut()
                .map(|card| &mut card.bid_input)
                .find(|input| input.key == key),
            _ => None,
        }
    }

    /// Replace the product list with a fetched snapshot
    ///
    /// Returns `false` and leaves everything untouched when the snapshot has
    /// the same fingerprint as the last one applied. Otherwise the list is
    /// rebuilt from scratch, with input state restored by key; focus on an
    /// input whose product is gone is dropped.
    pub fn reconcile(&mut self, products: Vec<Product>, focused: &mut Option<InputKey>) -> bool {
        let fingerprint = Fingerprint::of(&products);
        if self.fingerprint == Some(fingerprint) {
            return false;
        }

        let saved: HashMap<InputKey, SavedInput> = self
            .cards()
            .iter()
            .map(|card| {
                (
                    card.bid_input.key.clone(),
                    SavedInput {
                        value: card.bid_input.value.clone(),
                        selection: card.bid_input.selection,
                    },
                )
            })
            .collect();

        self.view = if products.is_empty() {
            CatalogView::Empty
        } else {
            CatalogView::Products(
                products
                    .into_iter()
                    .map(|product| {
                        let mut bid_input = NumberInput::new(bid_input_key(&product.name));
                        if let Some(saved) = saved.get(&bid_input.key) {
                            bid_input.value = saved.value.clone();
                            bid_input.selection = saved.selection;
                        }
                        ProductCard { product, bid_input }
                    })
                    .collect(),
            )
        };

        let focus_lost = focused
            .as_deref()
            .map(|key| is_bid_input(key) && self.input(key).is_none())
            .unwrap_or(false);
        if focus_lost {
            *focused = None;
        }

        self.fingerprint = Some(fingerprint);
        self.generation += 1;
        true
    }
}

#[cfg(test)]
impl Catalog {
    pub fn card(&self, product: crate::auction::ProductNameRef) -> Option<&ProductCard> {
        self.cards().iter().find(|card| card.product.name == product)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
