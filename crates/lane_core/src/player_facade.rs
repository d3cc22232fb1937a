//! Unified entry point for human and AI players.
//!
//! Input adapters (a touch handler, a network session, the headless runner)
//! drive a side through [`PlayerFacade`]. The built-in AI goes through the
//! same [`Simulation::play_card`] call, so neither side has a backdoor into
//! the entity store.

use crate::factions::Side;
use crate::math::{Fixed, Vec2Fixed};
use crate::simulation::{PlayOutcome, Simulation};
use crate::snapshot::MatchSnapshot;

/// What a player (human or scripted) can see and do.
pub trait PlayerFacade {
    /// Side this facade controls.
    fn side(&self) -> Side;

    /// Play a card from hand at a world position.
    fn play_card(&mut self, card_id: &str, position: Vec2Fixed) -> PlayOutcome;

    /// Cards in hand, in slot order.
    fn hand(&self) -> Vec<String>;

    /// Next card to be drawn.
    fn next_card(&self) -> Option<String>;

    /// Current elixir.
    fn elixir(&self) -> Fixed;

    /// Cost of a card, if the catalog defines it.
    fn card_cost(&self, card_id: &str) -> Option<u32>;

    /// Full match view.
    fn snapshot(&self) -> MatchSnapshot;

    /// Hand cards the side can pay for right now.
    fn playable_cards(&self) -> Vec<String> {
        let elixir = self.elixir();
        self.hand()
            .into_iter()
            .filter(|card| {
                self.card_cost(card)
                    .is_some_and(|cost| Fixed::from_num(cost) <= elixir)
            })
            .collect()
    }
}

/// A [`PlayerFacade`] over one side of a running simulation.
#[derive(Debug)]
pub struct SideController<'a> {
    sim: &'a mut Simulation,
    side: Side,
}

impl<'a> SideController<'a> {
    /// Control `side` of `sim`.
    pub fn new(sim: &'a mut Simulation, side: Side) -> Self {
        Self { sim, side }
    }
}

impl PlayerFacade for SideController<'_> {
    fn side(&self) -> Side {
        self.side
    }

    fn play_card(&mut self, card_id: &str, position: Vec2Fixed) -> PlayOutcome {
        self.sim.play_card(self.side, card_id, position)
    }

    fn hand(&self) -> Vec<String> {
        self.sim.hand(self.side).to_vec()
    }

    fn next_card(&self) -> Option<String> {
        self.sim.deck(self.side).next_card().map(str::to_string)
    }

    fn elixir(&self) -> Fixed {
        self.sim.elixir(self.side)
    }

    fn card_cost(&self, card_id: &str) -> Option<u32> {
        self.sim.catalog().get(card_id).map(|card| card.cost)
    }

    fn snapshot(&self) -> MatchSnapshot {
        self.sim.snapshot()
    }
}

impl Simulation {
    /// Borrow a facade for one side.
    pub fn controller(&mut self, side: Side) -> SideController<'_> {
        SideController::new(self, side)
    }
}
