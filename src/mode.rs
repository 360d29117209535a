//! Interaction mode state machine.
//!
//! Draw and cut are mutually exclusive; multi-select can only be active
//! while neither of them is. Every transition attaches the matching input
//! handlers to the rendered layer and returns the toolbar affordances to
//! show, so call sites never touch handlers themselves.

use bioannot_view::{DisplayPoint, FeatureHandler, MapHandler};

use crate::model::MIN_POLYGON_VERTICES;
use crate::store::FeatureStore;

/// Mode a transition can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Idle,
    Draw,
    Cut,
    MultiSelect,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Draw => "draw",
            Mode::Cut => "cut",
            Mode::MultiSelect => "multi-select",
        }
    }
}

/// Which toolbar controls are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub toolbar_expanded: bool,
    /// Draw, cut and select-multiple buttons.
    pub show_mode_buttons: bool,
    pub show_cancel_draw: bool,
    pub show_remove_last_vertex: bool,
    pub show_cancel_cut: bool,
    /// Merge, convex hull and delete-selected buttons.
    pub show_selection_actions: bool,
    /// Whether the select-multiple toggle is shown pressed.
    pub multi_select_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Tool {
    #[default]
    None,
    Draw,
    Cut,
}

/// Explicit interaction state.
#[derive(Debug, Clone)]
pub struct ModeMachine {
    tool: Tool,
    multi_select: bool,
    toolbar_expanded: bool,
    /// Vertices placed by the active draw or cut tool, in display space.
    vertices: Vec<DisplayPoint>,
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeMachine {
    pub fn new() -> Self {
        Self {
            tool: Tool::None,
            multi_select: false,
            toolbar_expanded: true,
            vertices: Vec::new(),
        }
    }

    /// The mode currently driving input.
    pub fn current_mode(&self) -> Mode {
        match (self.tool, self.multi_select) {
            (Tool::Draw, _) => Mode::Draw,
            (Tool::Cut, _) => Mode::Cut,
            (Tool::None, true) => Mode::MultiSelect,
            (Tool::None, false) => Mode::Idle,
        }
    }

    pub fn is_active(&self, mode: Mode) -> bool {
        match mode {
            Mode::Idle => self.tool == Tool::None && !self.multi_select,
            Mode::Draw => self.tool == Tool::Draw,
            Mode::Cut => self.tool == Tool::Cut,
            Mode::MultiSelect => self.multi_select,
        }
    }

    /// Whether clicking a feature opens its popup.
    pub fn allows_feature_popup(&self) -> bool {
        self.is_active(Mode::Idle)
    }

    pub fn affordances(&self) -> Affordances {
        let expanded = self.toolbar_expanded;
        Affordances {
            toolbar_expanded: expanded,
            show_mode_buttons: expanded,
            show_cancel_draw: expanded && self.tool == Tool::Draw,
            show_remove_last_vertex: expanded && self.tool == Tool::Draw && !self.vertices.is_empty(),
            show_cancel_cut: expanded && self.tool == Tool::Cut,
            show_selection_actions: expanded && self.multi_select,
            multi_select_active: self.multi_select,
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Enter `mode`. Conflicting modes are exited first; entering
    /// [`Mode::Idle`] exits everything.
    pub fn enter(&mut self, mode: Mode, store: &mut FeatureStore) -> Affordances {
        match mode {
            Mode::Idle => {
                self.exit_tool(store);
                self.exit_multi_select(store);
            }
            Mode::Draw | Mode::Cut => {
                let tool = if mode == Mode::Draw { Tool::Draw } else { Tool::Cut };
                if self.tool != tool {
                    self.exit_tool(store);
                    self.exit_multi_select(store);
                    self.tool = tool;
                    self.vertices.clear();
                    let layer = store.layer_mut();
                    layer.close_popup();
                    layer.set_map_handler(if tool == Tool::Draw {
                        MapHandler::PlaceVertex
                    } else {
                        MapHandler::CutShape
                    });
                    layer.set_feature_handler(FeatureHandler::Captured);
                    log::debug!("🎛️ Mode: enter {}", mode.name());
                }
            }
            Mode::MultiSelect => {
                if !self.multi_select {
                    self.exit_tool(store);
                    self.multi_select = true;
                    let layer = store.layer_mut();
                    layer.close_popup();
                    layer.set_feature_handler(FeatureHandler::ToggleSelection);
                    log::debug!("🎛️ Mode: enter {}", mode.name());
                }
            }
        }
        self.affordances()
    }

    /// Leave `mode` if it is active.
    pub fn exit(&mut self, mode: Mode, store: &mut FeatureStore) -> Affordances {
        match mode {
            Mode::Idle => {}
            Mode::Draw if self.tool == Tool::Draw => self.exit_tool(store),
            Mode::Cut if self.tool == Tool::Cut => self.exit_tool(store),
            Mode::MultiSelect => self.exit_multi_select(store),
            _ => {}
        }
        self.affordances()
    }

    /// Enter `mode` if inactive, leave it otherwise.
    pub fn toggle(&mut self, mode: Mode, store: &mut FeatureStore) -> Affordances {
        if mode != Mode::Idle && self.is_active(mode) {
            self.exit(mode, store)
        } else {
            self.enter(mode, store)
        }
    }

    pub fn toggle_toolbar(&mut self) -> Affordances {
        self.toolbar_expanded = !self.toolbar_expanded;
        log::debug!("🎛️ Toolbar expanded: {}", self.toolbar_expanded);
        self.affordances()
    }

    fn exit_tool(&mut self, store: &mut FeatureStore) {
        if self.tool == Tool::None {
            return;
        }
        let mode = if self.tool == Tool::Draw { Mode::Draw } else { Mode::Cut };
        self.tool = Tool::None;
        self.vertices.clear();
        let layer = store.layer_mut();
        layer.set_map_handler(MapHandler::Navigate);
        layer.set_feature_handler(FeatureHandler::OpenPopup);
        log::debug!("🎛️ Mode: exit {}", mode.name());
    }

    fn exit_multi_select(&mut self, store: &mut FeatureStore) {
        if !self.multi_select {
            return;
        }
        self.multi_select = false;
        store.clear_selection();
        store.layer_mut().set_feature_handler(FeatureHandler::OpenPopup);
        log::debug!("🎛️ Mode: exit {}", Mode::MultiSelect.name());
    }

    // ========================================================================
    // Vertex placement
    // ========================================================================

    /// Vertices placed so far by the active tool.
    pub fn vertices(&self) -> &[DisplayPoint] {
        &self.vertices
    }

    /// Place a vertex for the active draw or cut tool.
    pub fn place_vertex(&mut self, point: DisplayPoint) -> bool {
        if self.tool == Tool::None {
            return false;
        }
        self.vertices.push(point);
        true
    }

    /// Remove the most recently placed draw vertex. Draw mode is left once
    /// no vertex remains.
    pub fn remove_last_vertex(&mut self, store: &mut FeatureStore) -> Affordances {
        if self.tool == Tool::Draw {
            self.vertices.pop();
            if self.vertices.is_empty() {
                self.exit_tool(store);
            }
        }
        self.affordances()
    }

    /// Finish the polygon being drawn and leave draw mode.
    ///
    /// Returns `None` (and stays in draw mode) when too few vertices have
    /// been placed.
    pub fn finish_draw(&mut self, store: &mut FeatureStore) -> Option<Vec<DisplayPoint>> {
        if self.tool != Tool::Draw || self.vertices.len() < MIN_POLYGON_VERTICES {
            return None;
        }
        let vertices = std::mem::take(&mut self.vertices);
        self.exit_tool(store);
        Some(vertices)
    }

    /// Finish the cut gesture; cut mode always disables itself afterwards.
    pub fn finish_cut(&mut self, store: &mut FeatureStore) -> Option<Vec<DisplayPoint>> {
        if self.tool != Tool::Cut {
            return None;
        }
        let vertices = std::mem::take(&mut self.vertices);
        self.exit_tool(store);
        (vertices.len() >= MIN_POLYGON_VERTICES).then_some(vertices)
    }
}
