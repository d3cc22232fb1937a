//! Hand and draw pile management.
//!
//! A side starts from its configured deck list. The hand holds up to
//! `hand_size` cards; played cards leave the hand and the hand is refilled
//! from the draw pile. Once the starting pile runs dry it is rebuilt from the
//! whole card catalog minus the cards currently held, shuffled with the
//! deck's own seeded generator.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

/// One side's cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<String>,
    pool: Vec<String>,
    hand: Vec<String>,
    draw_pile: VecDeque<String>,
    hand_size: usize,
    reshuffles: u32,
    rng: Pcg64Mcg,
}

impl Deck {
    /// Create a deck with an empty hand. Call [`Deck::deal`] to start.
    ///
    /// `cards` is the opening deck list; `pool` is every card id the draw
    /// pile is rebuilt from after it empties.
    #[must_use]
    pub fn new(cards: Vec<String>, pool: Vec<String>, hand_size: usize, seed: u64) -> Self {
        Self {
            cards,
            pool,
            hand: Vec::with_capacity(hand_size),
            draw_pile: VecDeque::new(),
            hand_size,
            reshuffles: 0,
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Shuffle the full deck into the draw pile and deal a fresh hand.
    pub fn deal(&mut self) {
        self.hand.clear();
        let mut pile = self.cards.clone();
        pile.shuffle(&mut self.rng);
        self.draw_pile = pile.into();
        self.refill();
    }

    /// Cards in hand, in slot order.
    #[must_use]
    pub fn hand(&self) -> &[String] {
        &self.hand
    }

    /// The card that will be drawn next.
    #[must_use]
    pub fn next_card(&self) -> Option<&str> {
        self.draw_pile.front().map(String::as_str)
    }

    /// The draw pile, next card first.
    #[must_use]
    pub const fn draw_pile(&self) -> &VecDeque<String> {
        &self.draw_pile
    }

    /// Cards waiting in the draw pile.
    #[must_use]
    pub fn draw_pile_len(&self) -> usize {
        self.draw_pile.len()
    }

    /// The opening deck list.
    #[must_use]
    pub fn cards(&self) -> &[String] {
        &self.cards
    }

    /// How many times the draw pile was rebuilt.
    #[must_use]
    pub const fn reshuffles(&self) -> u32 {
        self.reshuffles
    }

    /// Whether `card` is currently in hand.
    #[must_use]
    pub fn in_hand(&self, card: &str) -> bool {
        self.hand.iter().any(|held| held == card)
    }

    /// Remove `card` from the hand. Returns `false` when it is not held.
    pub fn take(&mut self, card: &str) -> bool {
        match self.hand.iter().position(|held| held == card) {
            Some(index) => {
                self.hand.remove(index);
                true
            }
            None => false,
        }
    }

    /// Draw until the hand is full, rebuilding the pile when it runs dry.
    pub fn refill(&mut self) {
        while self.hand.len() < self.hand_size {
            if self.draw_pile.is_empty() && !self.reshuffle() {
                break;
            }
            if let Some(card) = self.draw_pile.pop_front() {
                self.hand.push(card);
            }
        }
    }

    fn reshuffle(&mut self) -> bool {
        let mut pile: Vec<String> = self
            .pool
            .iter()
            .filter(|card| !self.in_hand(card))
            .cloned()
            .collect();
        if pile.is_empty() {
            return false;
        }
        pile.shuffle(&mut self.rng);
        self.draw_pile = pile.into();
        self.reshuffles += 1;
        tracing::trace!(pile = self.draw_pile.len(), "Draw pile reshuffled");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    fn eight() -> Vec<String> {
        ids(&["a", "b", "c", "d", "e", "f", "g", "h"])
    }

    fn catalog_ids() -> Vec<String> {
        ids(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"])
    }

    #[test]
    fn test_deal_fills_hand() {
        let mut deck = Deck::new(eight(), catalog_ids(), 4, 7);
        deck.deal();
        assert_eq!(deck.hand().len(), 4);
        assert_eq!(deck.draw_pile_len(), 4);
        assert!(deck.next_card().is_some());
    }

    #[test]
    fn test_take_and_refill() {
        let mut deck = Deck::new(eight(), catalog_ids(), 4, 7);
        deck.deal();
        let card = deck.hand()[2].clone();
        let next = deck.next_card().map(str::to_string);
        assert!(deck.take(&card));
        assert!(!deck.take(&card));
        deck.refill();
        assert_eq!(deck.hand().len(), 4);
        assert_eq!(deck.hand().last(), next.as_ref());
    }

    #[test]
    fn test_empty_pile_reshuffles_without_held_cards() {
        let mut deck = Deck::new(ids(&["a", "b", "c", "d", "e"]), ids(&["a", "b", "c", "d", "e"]), 4, 3);
        deck.deal();
        for _ in 0..12 {
            let card = deck.hand()[0].clone();
            assert!(deck.take(&card));
            deck.refill();
            assert_eq!(deck.hand().len(), 4);
            let mut sorted = deck.hand().to_vec();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), 4, "hand never holds duplicates");
        }
        assert!(deck.reshuffles() > 0);
    }

    #[test]
    fn test_same_seed_same_order() {
        let mut a = Deck::new(eight(), catalog_ids(), 4, 99);
        let mut b = Deck::new(eight(), catalog_ids(), 4, 99);
        a.deal();
        b.deal();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reshuffle_draws_from_whole_catalog() {
        let mut deck = Deck::new(ids(&["a", "b", "c", "d", "e"]), catalog_ids(), 4, 11);
        deck.deal();
        let mut seen: Vec<String> = deck.hand().to_vec();
        for _ in 0..60 {
            let card = deck.hand()[0].clone();
            assert!(deck.take(&card));
            deck.refill();
            assert_eq!(deck.hand().len(), 4);
            seen.extend(deck.hand().iter().cloned());
        }
        seen.sort();
        seen.dedup();
        assert!(deck.reshuffles() > 1);
        assert_eq!(seen, catalog_ids());
    }
}
