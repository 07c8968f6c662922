//! Display surface abstraction and the game-state projection onto it.
//!
//! A [`Surface`] exposes a fixed set of [`Element`]s addressed by stable ids.
//! Any element may be missing. Rendering skips missing elements and never
//! fails the surrounding flow.

use std::collections::HashMap;

use crate::protocol::Side;
use crate::state::GameState;

/// Addressable display elements, identified by stable ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    /// Section holding the session-id input and join button.
    SessionSection,
    /// Section holding the scoreboard and point buttons.
    ScoreSection,
    ScoreA,
    ScoreB,
    TeamA,
    TeamB,
    /// Serve indicator.
    ServerDisplay,
    /// Index of the set in progress.
    CurrentSet,
    /// Set tally, e.g. `1-0`.
    SetScore,
}

impl Element {
    /// Every element, in render order.
    pub const ALL: [Self; 9] = [
        Self::SessionSection,
        Self::ScoreSection,
        Self::ScoreA,
        Self::ScoreB,
        Self::TeamA,
        Self::TeamB,
        Self::ServerDisplay,
        Self::CurrentSet,
        Self::SetScore,
    ];

    /// Stable identifier of this element.
    pub const fn id(self) -> &'static str {
        match self {
            Self::SessionSection => "sessionSection",
            Self::ScoreSection => "scoreSection",
            Self::ScoreA => "scoreA",
            Self::ScoreB => "scoreB",
            Self::TeamA => "teamA",
            Self::TeamB => "teamB",
            Self::ServerDisplay => "serverDisplay",
            Self::CurrentSet => "currentSet",
            Self::SetScore => "setScore",
        }
    }
}

/// Something the client can render onto and notify through.
///
/// `set_text` and `set_hidden` return `false` when the element does not
/// exist on this surface. Callers treat that as a skip, not an error.
pub trait Surface: Send + 'static {
    /// Replace the text content of `element`.
    fn set_text(&mut self, element: Element, text: &str) -> bool;

    /// Show or hide `element`.
    fn set_hidden(&mut self, element: Element, hidden: bool) -> bool;

    /// Blocking notification to the user. Returns once it was acknowledged.
    fn alert(&mut self, message: &str);
}

/// Text projection of a [`GameState`], ready to be written to a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreView {
    pub score_a: String,
    pub score_b: String,
    pub team_a: String,
    pub team_b: String,
    pub serving: String,
    pub current_set: String,
    pub set_score: String,
}

impl ScoreView {
    /// Project `state`. Absent team names fall back to the default labels.
    pub fn project(state: &GameState) -> Self {
        let team = |side: Side| {
            state
                .team_name(side)
                .unwrap_or(side.default_team_label())
                .to_string()
        };
        Self {
            score_a: state.score_a.to_string(),
            score_b: state.score_b.to_string(),
            team_a: team(Side::A),
            team_b: team(Side::B),
            serving: serving_label(state.server),
            current_set: format!("Satz {}", state.current_set),
            set_score: format!("{}-{}", state.sets_won_a, state.sets_won_b),
        }
    }
}

/// Human-readable serve indicator.
pub fn serving_label(server: Side) -> String {
    format!("Aufschlag: Team {server}")
}

/// Write `view` onto `surface`, skipping elements the surface lacks.
pub fn render_view<S: Surface + ?Sized>(surface: &mut S, view: &ScoreView) {
    let targets = [
        (Element::ScoreA, view.score_a.as_str()),
        (Element::ScoreB, view.score_b.as_str()),
        (Element::TeamA, view.team_a.as_str()),
        (Element::TeamB, view.team_b.as_str()),
        (Element::ServerDisplay, view.serving.as_str()),
        (Element::CurrentSet, view.current_set.as_str()),
        (Element::SetScore, view.set_score.as_str()),
    ];
    for (element, text) in targets {
        if !surface.set_text(element, text) {
            tracing::trace!(element = element.id(), "display element missing, skipped");
        }
    }
}

/// Switch from the join section to the scoring section.
pub fn show_scoring<S: Surface + ?Sized>(surface: &mut S) {
    if !surface.set_hidden(Element::SessionSection, true) {
        tracing::trace!("session section missing, skipped");
    }
    if !surface.set_hidden(Element::ScoreSection, false) {
        tracing::trace!("score section missing, skipped");
    }
}

// ── In-memory surface ───────────────────────────────────────────────

/// State of one element on a [`MemorySurface`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementState {
    pub text: String,
    pub hidden: bool,
}

/// A [`Surface`] backed by a map, recording every alert.
///
/// Useful for headless embedding and tests. Only the elements it was built
/// with exist; writes to any other element are skipped.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    elements: HashMap<Element, ElementState>,
    alerts: Vec<String>,
}

impl MemorySurface {
    /// A surface with every [`Element`]. The score section starts hidden.
    pub fn new() -> Self {
        let mut surface = Self::with_elements(Element::ALL);
        if let Some(section) = surface.elements.get_mut(&Element::ScoreSection) {
            section.hidden = true;
        }
        surface
    }

    /// A surface with only the given elements. All start visible.
    pub fn with_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        Self {
            elements: elements
                .into_iter()
                .map(|e| (e, ElementState::default()))
                .collect(),
            alerts: Vec::new(),
        }
    }

    /// Text of `element`, if it exists.
    pub fn text(&self, element: Element) -> Option<&str> {
        self.elements.get(&element).map(|e| e.text.as_str())
    }

    /// Whether `element` is hidden, if it exists.
    pub fn is_hidden(&self, element: Element) -> Option<bool> {
        self.elements.get(&element).map(|e| e.hidden)
    }

    /// Alerts shown so far, oldest first.
    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for MemorySurface {
    fn set_text(&mut self, element: Element, text: &str) -> bool {
        match self.elements.get_mut(&element) {
            Some(state) => {
                text.clone_into(&mut state.text);
                true
            }
            None => false,
        }
    }

    fn set_hidden(&mut self, element: Element, hidden: bool) -> bool {
        match self.elements.get_mut(&element) {
            Some(state) => {
                state.hidden = hidden;
                true
            }
            None => false,
        }
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::GameSnapshot;

    fn state() -> GameState {
        GameState::from_snapshot(
            "S1",
            GameSnapshot {
                score_a: 5,
                score_b: 3,
                team_a: Some("Red".into()),
                server: Side::B,
                sets_won_a: 1,
                ..GameSnapshot::default()
            },
        )
    }

    #[test]
    fn element_ids_are_distinct() {
        let ids: std::collections::HashSet<_> = Element::ALL.iter().map(|e| e.id()).collect();
        assert_eq!(ids.len(), Element::ALL.len());
    }

    #[test]
    fn default_surface_has_every_element() {
        let surface = MemorySurface::default();
        for element in Element::ALL {
            assert!(surface.text(element).is_some(), "{} missing", element.id());
        }
        assert_eq!(surface.is_hidden(Element::ScoreSection), Some(true));
        assert_eq!(surface.is_hidden(Element::SessionSection), Some(false));
    }

    #[test]
    fn projection_fills_defaults() {
        let view = ScoreView::project(&state());
        assert_eq!(view.score_a, "5");
        assert_eq!(view.score_b, "3");
        assert_eq!(view.team_a, "Red");
        assert_eq!(view.team_b, "Team B");
        assert_eq!(view.serving, "Aufschlag: Team B");
        assert_eq!(view.current_set, "Satz 1");
        assert_eq!(view.set_score, "1-0");
    }

    #[test]
    fn render_skips_missing_elements() {
        let mut surface = MemorySurface::with_elements([Element::ScoreB]);
        render_view(&mut surface, &ScoreView::project(&state()));
        assert_eq!(surface.text(Element::ScoreB), Some("3"));
        assert_eq!(surface.text(Element::ScoreA), None);
    }

    #[test]
    fn render_on_empty_surface_is_harmless() {
        let mut surface = MemorySurface::with_elements([]);
        render_view(&mut surface, &ScoreView::project(&state()));
        show_scoring(&mut surface);
        assert!(surface.alerts().is_empty());
    }

    #[test]
    fn show_scoring_swaps_sections() {
        let mut surface = MemorySurface::new();
        assert_eq!(surface.is_hidden(Element::ScoreSection), Some(true));
        show_scoring(&mut surface);
        assert_eq!(surface.is_hidden(Element::SessionSection), Some(true));
        assert_eq!(surface.is_hidden(Element::ScoreSection), Some(false));
    }

    #[test]
    fn render_through_trait_object() {
        let mut surface: Box<dyn Surface> = Box::new(MemorySurface::new());
        render_view(surface.as_mut(), &ScoreView::project(&state()));
    }
}
