use crate::model::GridTopology;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Single column: controls, grid and lists stacked vertically.
    Stacked,
    /// Fixed-width side panels around a flexible grid.
    Panels,
}

impl LayoutMode {
    pub fn for_width(width: u32, profile: &LayoutProfile) -> Self {
        if width < profile.breakpoint {
            LayoutMode::Stacked
        } else {
            LayoutMode::Panels
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayoutMode::Stacked => "stacked",
            LayoutMode::Panels => "panels",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClamp {
    pub min: u32,
    pub max: u32,
}

impl SizeClamp {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn apply(&self, value: u32) -> u32 {
        value.max(self.min).min(self.max.max(self.min))
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max.max(self.min)).contains(&value)
    }
}

/// Space budgets for one rendering surface. All quantities share a unit:
/// pixels for [`LayoutProfile::PIXELS`], character cells for
/// [`LayoutProfile::TERMINAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutProfile {
    pub breakpoint: u32,
    pub left_panel: u32,
    pub right_panel: u32,
    pub horizontal_margin: u32,
    pub vertical_reserve: u32,
    pub stacked_margin: u32,
    pub stacked_clamp: SizeClamp,
    pub panel_clamp: SizeClamp,
    pub default_size: u32,
    /// Multiplier turning viewport height into width units.
    pub vertical_scale: u32,
}

impl LayoutProfile {
    pub const PIXELS: Self = Self {
        breakpoint: 1100,
        left_panel: 300,
        right_panel: 370,
        horizontal_margin: 80,
        vertical_reserve: 140,
        stacked_margin: 80,
        stacked_clamp: SizeClamp::new(32, 64),
        panel_clamp: SizeClamp::new(40, 80),
        default_size: 56,
        vertical_scale: 1,
    };

    pub const TERMINAL: Self = Self {
        breakpoint: 110,
        left_panel: 34,
        right_panel: 40,
        horizontal_margin: 6,
        vertical_reserve: 10,
        stacked_margin: 6,
        stacked_clamp: SizeClamp::new(4, 7),
        panel_clamp: SizeClamp::new(4, 9),
        default_size: 5,
        vertical_scale: 2,
    };

    pub fn clamp_for(&self, mode: LayoutMode) -> SizeClamp {
        match mode {
            LayoutMode::Stacked => self.stacked_clamp,
            LayoutMode::Panels => self.panel_clamp,
        }
    }

    /// Height of a cell of `size` width units, in viewport rows.
    pub fn cell_rows(&self, size: u32) -> u32 {
        (size / self.vertical_scale.max(1)).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridExtent {
    pub columns: u32,
    pub rows: u32,
}

impl GridExtent {
    /// Used when a topology is loaded but carries no nodes.
    pub const FALLBACK: Self = Self {
        columns: 10,
        rows: 10,
    };

    pub fn of(topology: &GridTopology) -> Self {
        topology
            .bounds()
            .map(|bounds| GridExtent {
                columns: bounds.columns(),
                rows: bounds.rows(),
            })
            .unwrap_or(Self::FALLBACK)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPlan {
    pub mode: LayoutMode,
    pub cell_size: u32,
}

pub fn plan(
    viewport: Viewport,
    topology: Option<&GridTopology>,
    profile: &LayoutProfile,
) -> LayoutPlan {
    let mode = LayoutMode::for_width(viewport.width, profile);
    let extent = topology.map(GridExtent::of);
    LayoutPlan {
        mode,
        cell_size: cell_size(viewport, extent, mode, profile),
    }
}

/// Largest cell size that fits the grid in the space left after panels and
/// axis labels. Always inside the mode's clamp range.
pub fn cell_size(
    viewport: Viewport,
    extent: Option<GridExtent>,
    mode: LayoutMode,
    profile: &LayoutProfile,
) -> u32 {
    let clamp = profile.clamp_for(mode);
    let Some(extent) = extent else {
        return clamp.apply(profile.default_size);
    };

    match mode {
        LayoutMode::Stacked => {
            let available = viewport.width.saturating_sub(profile.stacked_margin);
            clamp.apply(fit(available, extent.columns, 0.5))
        }
        LayoutMode::Panels => {
            let available_width = viewport
                .width
                .saturating_sub(profile.left_panel)
                .saturating_sub(profile.right_panel)
                .saturating_sub(profile.horizontal_margin);
            let available_height = viewport
                .height
                .saturating_mul(profile.vertical_scale.max(1))
                .saturating_sub(profile.vertical_reserve);
            let by_width = fit(available_width, extent.columns, 0.5);
            let by_height = fit(available_height, extent.rows, 1.5);
            clamp.apply(by_width.min(by_height))
        }
    }
}

fn fit(available: u32, count: u32, label_allowance: f64) -> u32 {
    let slots = f64::from(count) + label_allowance;
    (f64::from(available) / slots).floor() as u32
}
