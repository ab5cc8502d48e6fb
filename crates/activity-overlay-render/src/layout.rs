//! Overlay box sizing and item placement.
//!
//! Sizing and painting share one routine, [`grid_geometry`], so a box is
//! always exactly as large as what the composer later paints into it.

use activity_overlay::StatValues;
use smallvec::SmallVec;

use crate::fields::{canonical_fields, OverlayField};
use crate::font::{font_compensation, quote_first_family, TextMeasurer};
use crate::options::{LayoutMode, MapPosition, OverlayOptions, Position};
use crate::render_ir::{ResolvedTextStyle, TextAlign};

/// Value font size at scale 1 before compensation.
pub const BASE_VALUE_FONT_PX: f32 = 32.0;
/// Smallest value font size.
pub const MIN_VALUE_FONT_PX: f32 = 12.0;
/// Smallest label font size.
pub const MIN_LABEL_FONT_PX: f32 = 10.0;
pub const LABEL_WEIGHT: u16 = 500;
pub const VALUE_WEIGHT: u16 = 700;
/// Opacity applied to labels.
pub const LABEL_OPACITY: f32 = 0.85;
/// Mini-map edge relative to the value font size.
pub const MAP_SIZE_FACTOR: f32 = 4.0;
/// Side map growth above or below the stats.
pub const VERTICAL_SIDE_MAP_FACTOR: f32 = 2.5;
/// Side map growth left or right of the stats.
pub const HORIZONTAL_SIDE_MAP_FACTOR: f32 = 2.0;
/// Upper bound for `auto` column selection.
pub const AUTO_MAX_COLUMNS: usize = 4;

/// Pixel metrics derived from the value font size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayMetrics {
    pub value_font_px: f32,
    pub label_font_px: f32,
    pub padding: f32,
    pub line_gap: f32,
    pub label_gap: f32,
    pub corner_radius: f32,
    /// Label, label gap and value stacked.
    pub item_height: f32,
    /// Edge of a mini-map placed in a grid cell.
    pub map_size: f32,
    /// Label, label gap and mini-map stacked.
    pub map_item_height: f32,
}

impl OverlayMetrics {
    pub fn from_value_size(value_font_px: f32) -> Self {
        let v = value_font_px.max(MIN_VALUE_FONT_PX);
        let label = (0.5 * v).round().max(MIN_LABEL_FONT_PX);
        let label_gap = (0.2 * v).round();
        let map_size = MAP_SIZE_FACTOR * v;
        Self {
            value_font_px: v,
            label_font_px: label,
            padding: (0.5 * v).round(),
            line_gap: (0.45 * v).round(),
            label_gap,
            corner_radius: (0.3 * v).round(),
            item_height: label + label_gap + v,
            map_size,
            map_item_height: label + label_gap + map_size,
        }
    }

    /// Metrics for the options' scale and a font compensation factor.
    pub fn for_options(options: &OverlayOptions, compensation: f32) -> Self {
        Self::from_value_size(BASE_VALUE_FONT_PX * options.effective_scale() * compensation)
    }

    pub fn label_style(&self, family: &str) -> ResolvedTextStyle {
        ResolvedTextStyle::new(family, LABEL_WEIGHT, self.label_font_px)
    }

    pub fn value_style(&self, family: &str) -> ResolvedTextStyle {
        ResolvedTextStyle::new(family, VALUE_WEIGHT, self.value_font_px)
    }

    /// Horizontal and vertical grid gaps for the options' gap multipliers.
    pub fn grid_gaps(&self, options: &OverlayOptions) -> (f32, f32) {
        (
            scaled_gap(self.line_gap, options.grid_gap_x),
            scaled_gap(self.line_gap, options.grid_gap_y),
        )
    }

    /// Edge of a map that sits beside the stats instead of in a cell.
    pub fn side_map_size(&self, placement: MapPosition) -> f32 {
        match placement {
            MapPosition::Top | MapPosition::Bottom => VERTICAL_SIDE_MAP_FACTOR * self.map_size,
            MapPosition::Left | MapPosition::Right => HORIZONTAL_SIDE_MAP_FACTOR * self.map_size,
            MapPosition::Grid => self.map_size,
        }
    }
}

fn scaled_gap(line_gap: f32, factor: f32) -> f32 {
    let factor = if factor.is_finite() { factor.max(0.0) } else { 0.0 };
    (line_gap * factor).round().max(0.0)
}

/// One entry of the overlay, in canonical field order.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayItem {
    Text {
        field: OverlayField,
        label: &'static str,
        value: String,
    },
    RouteMap,
}

impl OverlayItem {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text { label, .. } => label,
            Self::RouteMap => OverlayField::RouteMap.label(),
        }
    }

    pub fn is_route_map(&self) -> bool {
        matches!(self, Self::RouteMap)
    }
}

/// Build items for the selected fields.
///
/// Selection order and duplicates are ignored. Fields without a value are
/// skipped, and the route map only appears when the activity has positions.
pub fn build_items(values: &StatValues, selected: &[OverlayField]) -> Vec<OverlayItem> {
    canonical_fields(selected)
        .into_iter()
        .filter_map(|field| match field {
            OverlayField::RouteMap => values.has_route().then_some(OverlayItem::RouteMap),
            _ => field.value(values).map(|value| OverlayItem::Text {
                field,
                label: field.label(),
                value: value.to_owned(),
            }),
        })
        .collect()
}

/// Column count for a layout mode.
///
/// `list` is always one column; `fixed` honors the request; `auto` picks
/// `ceil(sqrt(n))` up to [`AUTO_MAX_COLUMNS`]. The result never exceeds the
/// item count.
pub fn column_count(mode: LayoutMode, item_count: usize, requested: usize) -> usize {
    let limit = item_count.max(1);
    match mode {
        LayoutMode::List => 1,
        LayoutMode::Fixed => requested.clamp(1, limit),
        LayoutMode::Auto => {
            let root = (limit as f64).sqrt().ceil() as usize;
            root.clamp(1, AUTO_MAX_COLUMNS).min(limit)
        }
    }
}

/// Grid slot of one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

/// Row-major cell assignment.
///
/// A partial last row starts at column 0, except under right alignment
/// where it occupies the rightmost columns.
pub fn assign_cells(count: usize, columns: usize, align: TextAlign) -> Vec<GridCell> {
    let columns = columns.max(1);
    let last_row = count.saturating_sub(1) / columns;
    let last_row_len = count - last_row * columns;
    (0..count)
        .map(|index| {
            let row = index / columns;
            let mut col = index % columns;
            if row == last_row && align == TextAlign::Right {
                col += columns - last_row_len;
            }
            GridCell { row, col }
        })
        .collect()
}

/// Column and row extents of a grid of items.
#[derive(Clone, Debug, PartialEq)]
pub struct GridGeometry {
    pub columns: usize,
    pub rows: usize,
    /// Whole-pixel column widths.
    pub col_widths: SmallVec<[f32; 4]>,
    pub col_offsets: SmallVec<[f32; 4]>,
    pub row_heights: SmallVec<[f32; 8]>,
    pub row_offsets: SmallVec<[f32; 8]>,
    /// Extra left offset per row; non-zero only for centered partial rows.
    pub row_shifts: SmallVec<[f32; 8]>,
    /// Cell of each item, indexed like the input slices.
    pub assignments: Vec<GridCell>,
    pub width: f32,
    pub height: f32,
}

impl GridGeometry {
    /// Span of the occupied columns of `row`.
    pub fn row_content_width(&self, row: usize) -> f32 {
        let mut first = None;
        let mut last = None;
        for cell in self.assignments.iter().filter(|cell| cell.row == row) {
            first = Some(first.map_or(cell.col, |c: usize| c.min(cell.col)));
            last = Some(last.map_or(cell.col, |c: usize| c.max(cell.col)));
        }
        match (first, last) {
            (Some(first), Some(last)) => {
                self.col_offsets[last] + self.col_widths[last] - self.col_offsets[first]
            }
            _ => 0.0,
        }
    }

    /// Left edge of a cell relative to the grid origin.
    pub fn cell_left(&self, cell: GridCell) -> f32 {
        self.row_shifts[cell.row] + self.col_offsets[cell.col]
    }

    pub fn cell_top(&self, cell: GridCell) -> f32 {
        self.row_offsets[cell.row]
    }

    /// Text anchor of a cell relative to the grid origin.
    pub fn anchor_x(&self, cell: GridCell, align: TextAlign) -> f32 {
        let width = self.col_widths[cell.col];
        let inset = match align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (width / 2.0).round(),
            TextAlign::Right => width,
        };
        self.cell_left(cell) + inset
    }
}

/// Lay items out on a grid.
///
/// Column widths are the ceiling of the widest item in the column, row
/// heights the tallest item in the row. `widths` and `heights` are paired by
/// index; extra entries in the longer slice are ignored.
pub fn grid_geometry(
    widths: &[f32],
    heights: &[f32],
    columns: usize,
    gap_x: f32,
    gap_y: f32,
    align: TextAlign,
) -> GridGeometry {
    let count = widths.len().min(heights.len());
    let columns = columns.clamp(1, count.max(1));
    let rows = count.div_ceil(columns);
    let assignments = assign_cells(count, columns, align);

    let mut col_widths: SmallVec<[f32; 4]> = SmallVec::from_elem(0.0, columns);
    let mut row_heights: SmallVec<[f32; 8]> = SmallVec::from_elem(0.0, rows);
    for (index, cell) in assignments.iter().enumerate() {
        col_widths[cell.col] = col_widths[cell.col].max(sanitize(widths[index]));
        row_heights[cell.row] = row_heights[cell.row].max(sanitize(heights[index]));
    }
    for width in col_widths.iter_mut() {
        *width = width.ceil();
    }

    let mut col_offsets: SmallVec<[f32; 4]> = SmallVec::with_capacity(columns);
    let mut x = 0.0;
    for width in &col_widths {
        col_offsets.push(x);
        x += width + gap_x;
    }
    let mut row_offsets: SmallVec<[f32; 8]> = SmallVec::with_capacity(rows);
    let mut y = 0.0;
    for height in &row_heights {
        row_offsets.push(y);
        y += height + gap_y;
    }

    let width = if count == 0 {
        0.0
    } else {
        col_widths.iter().sum::<f32>() + (columns - 1) as f32 * gap_x
    };
    let height = if rows == 0 {
        0.0
    } else {
        row_heights.iter().sum::<f32>() + (rows - 1) as f32 * gap_y
    };

    let mut geometry = GridGeometry {
        columns,
        rows,
        col_widths,
        col_offsets,
        row_heights,
        row_offsets,
        row_shifts: SmallVec::from_elem(0.0, rows),
        assignments,
        width,
        height,
    };
    if align == TextAlign::Center {
        for row in 0..rows {
            let leftover = (geometry.width - geometry.row_content_width(row)).max(0.0);
            geometry.row_shifts[row] = (leftover / 2.0).round();
        }
    }
    log::trace!(
        "grid {}x{} cols={:?} rows={:?} size={}x{}",
        geometry.columns,
        geometry.rows,
        geometry.col_widths.as_slice(),
        geometry.row_heights.as_slice(),
        geometry.width,
        geometry.height
    );
    geometry
}

fn sanitize(px: f32) -> f32 {
    if px.is_finite() {
        px.max(0.0)
    } else {
        0.0
    }
}

/// A mini-map placed outside the stats grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SideMap {
    pub placement: MapPosition,
    /// Left edge relative to the box.
    pub x: f32,
    /// Top edge relative to the box.
    pub y: f32,
    pub size: f32,
}

/// Planned overlay box.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayLayout {
    pub metrics: OverlayMetrics,
    /// CSS-style family list used for every text command.
    pub font_family: String,
    pub width: u32,
    pub height: u32,
    /// Geometry of the items placed on the grid.
    pub grid: GridGeometry,
    /// Grid origin relative to the box.
    pub grid_x: f32,
    pub grid_y: f32,
    /// Indices into the planned items, in grid order.
    pub grid_items: Vec<usize>,
    pub side_map: Option<SideMap>,
}

/// Size and arrange `items` for `options`.
///
/// Deterministic: identical inputs and measurer give identical layouts.
pub fn plan(
    items: &[OverlayItem],
    options: &OverlayOptions,
    measurer: &dyn TextMeasurer,
) -> OverlayLayout {
    let compensation = font_compensation(&options.font_family, measurer);
    plan_with_compensation(items, options, measurer, compensation)
}

/// [`plan`] with a precomputed font compensation factor.
pub fn plan_with_compensation(
    items: &[OverlayItem],
    options: &OverlayOptions,
    measurer: &dyn TextMeasurer,
    compensation: f32,
) -> OverlayLayout {
    let metrics = OverlayMetrics::for_options(options, compensation);
    let font_family = quote_first_family(&options.font_family).into_owned();
    let label_style = metrics.label_style(&font_family);
    let value_style = metrics.value_style(&font_family);

    let side_placement = match options.map_position {
        MapPosition::Grid => None,
        placement => items
            .iter()
            .any(OverlayItem::is_route_map)
            .then_some(placement),
    };
    let grid_items: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| side_placement.is_none() || !item.is_route_map())
        .map(|(index, _)| index)
        .collect();

    let mut widths = Vec::with_capacity(grid_items.len());
    let mut heights = Vec::with_capacity(grid_items.len());
    for &index in &grid_items {
        match &items[index] {
            OverlayItem::Text { label, value, .. } => {
                let label_w = measurer.measure_text_px(label, &label_style);
                let value_w = measurer.measure_text_px(value, &value_style);
                widths.push(sanitize(label_w).max(sanitize(value_w)));
                heights.push(metrics.item_height);
            }
            OverlayItem::RouteMap => {
                widths.push(metrics.map_size);
                heights.push(metrics.map_item_height);
            }
        }
    }

    // The column count counts a side map as an item; the grid itself never
    // has more columns than stats.
    let columns = column_count(
        options.layout_mode,
        items.len(),
        options.effective_grid_columns(),
    )
    .min(grid_items.len().max(1));
    // A single column without a side map stacks like a list.
    let (gap_x, gap_y) = if side_placement.is_none() && columns == 1 {
        (0.0, metrics.line_gap)
    } else {
        metrics.grid_gaps(options)
    };
    let grid = grid_geometry(&widths, &heights, columns, gap_x, gap_y, options.text_align);

    let padding = metrics.padding;
    let (content_w, content_h, grid_x, grid_y, side_map) = match side_placement {
        None => (grid.width, grid.height, 0.0, 0.0, None),
        Some(placement) => {
            let size = metrics.side_map_size(placement);
            let arranged = arrange_side_map(
                placement,
                size,
                &grid,
                !grid_items.is_empty(),
                metrics.line_gap,
                options.text_align,
            );
            let map = SideMap {
                placement,
                x: padding + arranged.map_x,
                y: padding + arranged.map_y,
                size,
            };
            (
                arranged.content_w,
                arranged.content_h,
                arranged.grid_x,
                arranged.grid_y,
                Some(map),
            )
        }
    };

    let width = whole_px(content_w + 2.0 * padding);
    let height = whole_px(content_h + 2.0 * padding);
    log::debug!(
        "overlay plan: items={} mode={:?} columns={} side_map={:?} box={}x{}",
        items.len(),
        options.layout_mode,
        grid.columns,
        side_placement,
        width,
        height
    );
    OverlayLayout {
        metrics,
        font_family,
        width,
        height,
        grid,
        grid_x: padding + grid_x,
        grid_y: padding + grid_y,
        grid_items,
        side_map,
    }
}

struct SideArrangement {
    content_w: f32,
    content_h: f32,
    map_x: f32,
    map_y: f32,
    grid_x: f32,
    grid_y: f32,
}

fn arrange_side_map(
    placement: MapPosition,
    map: f32,
    grid: &GridGeometry,
    has_stats: bool,
    line_gap: f32,
    align: TextAlign,
) -> SideArrangement {
    let gap = if has_stats { line_gap } else { 0.0 };
    let (stats_w, stats_h) = if has_stats {
        (grid.width, grid.height)
    } else {
        (0.0, 0.0)
    };
    match placement {
        MapPosition::Top | MapPosition::Bottom => {
            let content_w = map.max(stats_w);
            let content_h = map + gap + stats_h;
            let map_x = align_offset(content_w, map, align);
            let grid_x = align_offset(content_w, stats_w, align);
            let (map_y, grid_y) = if placement == MapPosition::Top {
                (0.0, map + gap)
            } else {
                (stats_h + gap, 0.0)
            };
            SideArrangement {
                content_w,
                content_h,
                map_x,
                map_y,
                grid_x,
                grid_y,
            }
        }
        MapPosition::Left | MapPosition::Right | MapPosition::Grid => {
            let content_w = map + gap + stats_w;
            let content_h = map.max(stats_h);
            let (map_x, grid_x) = if placement == MapPosition::Right {
                (stats_w + gap, 0.0)
            } else {
                (0.0, map + gap)
            };
            SideArrangement {
                content_w,
                content_h,
                map_x,
                map_y: 0.0,
                grid_x,
                grid_y: 0.0,
            }
        }
    }
}

fn align_offset(container: f32, block: f32, align: TextAlign) -> f32 {
    let slack = (container - block).max(0.0);
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => (slack / 2.0).round(),
        TextAlign::Right => slack,
    }
}

fn whole_px(px: f32) -> u32 {
    if px.is_finite() && px > 0.0 {
        px.ceil().min(u32::MAX as f32) as u32
    } else {
        0
    }
}

/// Top-left corner of a box placed at `position` within the image.
///
/// The position is a fraction of the slack, so `0` touches the left/top edge
/// and `1` the right/bottom edge.
pub fn anchor(image_w: u32, image_h: u32, box_w: u32, box_h: u32, position: Position) -> (i32, i32) {
    let position = position.clamped();
    let slack_x = image_w as f32 - box_w as f32;
    let slack_y = image_h as f32 - box_h as f32;
    (
        (position.x * slack_x).round() as i32,
        (position.y * slack_y).round() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ten pixels per character at any style.
    struct PerChar;

    impl TextMeasurer for PerChar {
        fn measure_text_px(&self, text: &str, _style: &ResolvedTextStyle) -> f32 {
            text.chars().count() as f32 * 10.0
        }
    }

    fn values() -> StatValues {
        StatValues {
            distance: "12.34 km".into(),
            moving_time: "1:02:03".into(),
            avg_speed: "11.9 km/h".into(),
            max_speed: "35.2 km/h".into(),
            ascent: "120 m".into(),
            descent: "118 m".into(),
            ..StatValues::default()
        }
    }

    #[test]
    fn metrics_at_base_size() {
        let m = OverlayMetrics::from_value_size(32.0);
        assert_eq!(m.label_font_px, 16.0);
        assert_eq!(m.padding, 16.0);
        assert_eq!(m.line_gap, 14.0);
        assert_eq!(m.label_gap, 6.0);
        assert_eq!(m.corner_radius, 10.0);
        assert_eq!(m.item_height, 54.0);
        assert_eq!(m.map_size, 128.0);
        assert_eq!(m.map_item_height, 150.0);
    }

    #[test]
    fn metrics_respect_minimum_sizes() {
        let m = OverlayMetrics::from_value_size(1.0);
        assert_eq!(m.value_font_px, MIN_VALUE_FONT_PX);
        assert_eq!(m.label_font_px, MIN_LABEL_FONT_PX);
    }

    #[test]
    fn build_items_skips_absent_fields_and_missing_route() {
        let items = build_items(
            &values(),
            &[OverlayField::RouteMap, OverlayField::AvgPace, OverlayField::Distance],
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label(), "Distance");
    }

    #[test]
    fn column_count_per_mode() {
        assert_eq!(column_count(LayoutMode::List, 7, 3), 1);
        assert_eq!(column_count(LayoutMode::Fixed, 7, 3), 3);
        assert_eq!(column_count(LayoutMode::Fixed, 2, 3), 2);
        assert_eq!(column_count(LayoutMode::Fixed, 0, 0), 1);
        assert_eq!(column_count(LayoutMode::Auto, 5, 1), 3);
        assert_eq!(column_count(LayoutMode::Auto, 30, 1), AUTO_MAX_COLUMNS);
        assert_eq!(column_count(LayoutMode::Auto, 1, 1), 1);
    }

    #[test]
    fn right_aligned_partial_row_uses_trailing_columns() {
        let cells = assign_cells(7, 3, TextAlign::Right);
        assert_eq!(cells[6], GridCell { row: 2, col: 2 });
        let cells = assign_cells(7, 3, TextAlign::Left);
        assert_eq!(cells[6], GridCell { row: 2, col: 0 });
        let cells = assign_cells(6, 3, TextAlign::Right);
        assert_eq!(cells[5], GridCell { row: 1, col: 2 });
        assert_eq!(cells[3], GridCell { row: 1, col: 0 });
    }

    #[test]
    fn grid_geometry_sums_columns_and_rows() {
        let g = grid_geometry(
            &[10.2, 30.0, 20.4],
            &[54.0, 54.0, 150.0],
            2,
            5.0,
            7.0,
            TextAlign::Left,
        );
        assert_eq!(g.rows, 2);
        assert_eq!(g.col_widths.as_slice(), &[21.0, 30.0]);
        assert_eq!(g.col_offsets.as_slice(), &[0.0, 26.0]);
        assert_eq!(g.row_heights.as_slice(), &[54.0, 150.0]);
        assert_eq!(g.row_offsets.as_slice(), &[0.0, 61.0]);
        assert_eq!(g.width, 56.0);
        assert_eq!(g.height, 211.0);
    }

    #[test]
    fn centered_partial_row_is_shifted() {
        let g = grid_geometry(&[40.0; 3], &[10.0; 3], 2, 10.0, 0.0, TextAlign::Center);
        assert_eq!(g.row_shifts.as_slice(), &[0.0, 25.0]);
        assert_eq!(g.anchor_x(g.assignments[2], TextAlign::Center), 45.0);
    }

    #[test]
    fn empty_grid_has_zero_extent() {
        let g = grid_geometry(&[], &[], 3, 5.0, 5.0, TextAlign::Left);
        assert_eq!((g.rows, g.width, g.height), (0, 0.0, 0.0));
    }

    #[test]
    fn list_box_matches_formula() {
        let options = OverlayOptions::default().with_fields(&[
            OverlayField::Distance,
            OverlayField::MovingTime,
        ]);
        let items = build_items(&values(), &options.selected_fields);
        let layout = plan(&items, &options, &PerChar);
        // "12.34 km" and "Duration" are both 8 chars.
        assert_eq!(layout.width, 80 + 32);
        assert_eq!(layout.height, 2 * 54 + 14 + 32);
    }

    #[test]
    fn side_map_without_stats_is_square() {
        let options = OverlayOptions {
            map_position: MapPosition::Left,
            ..OverlayOptions::default()
        }
        .with_fields(&[OverlayField::RouteMap]);
        let mut stats = values();
        stats.route_points = vec![
            activity_overlay::RoutePoint::new(1.0, 1.0),
            activity_overlay::RoutePoint::new(1.1, 1.2),
        ];
        let items = build_items(&stats, &options.selected_fields);
        let layout = plan(&items, &options, &PerChar);
        assert_eq!((layout.width, layout.height), (256 + 32, 256 + 32));
        assert!(layout.grid_items.is_empty());
        let map = layout.side_map.expect("side map");
        assert_eq!((map.x, map.y, map.size), (16.0, 16.0, 256.0));
    }

    #[test]
    fn anchor_follows_slack_fraction() {
        assert_eq!(anchor(1000, 800, 200, 100, Position::new(0.0, 0.0)), (0, 0));
        assert_eq!(anchor(1000, 800, 200, 100, Position::new(1.0, 1.0)), (800, 700));
        assert_eq!(anchor(1000, 800, 200, 100, Position::new(0.5, 0.5)), (400, 350));
        assert_eq!(anchor(1000, 800, 200, 100, Position::new(2.0, -1.0)), (800, 0));
    }
}
