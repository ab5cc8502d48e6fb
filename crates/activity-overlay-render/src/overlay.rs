//! Overlay composition: stats in, draw commands and pixel box out.

use std::sync::Arc;

use activity_overlay::StatValues;

use crate::font::{HeuristicTextMeasurer, TextMeasurer};
use crate::layout::{anchor, build_items, plan, OverlayItem, OverlayLayout, LABEL_OPACITY};
use crate::options::{BackgroundMode, OverlayOptions};
use crate::render_ir::{
    DrawCommand, OverlayFrame, RenderResult, ResolvedTextStyle, RoundedRectCommand, TextAlign,
    TextCommand,
};
use crate::route::project_mini_map;

/// Builds overlay frames with a shared text measurer.
#[derive(Clone)]
pub struct OverlayComposer {
    measurer: Arc<dyn TextMeasurer>,
}

impl Default for OverlayComposer {
    fn default() -> Self {
        Self::new(Arc::new(HeuristicTextMeasurer))
    }
}

impl core::fmt::Debug for OverlayComposer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OverlayComposer").finish_non_exhaustive()
    }
}

impl OverlayComposer {
    pub fn new(measurer: Arc<dyn TextMeasurer>) -> Self {
        Self { measurer }
    }

    pub fn measurer(&self) -> &dyn TextMeasurer {
        self.measurer.as_ref()
    }

    /// Plan the overlay box without emitting commands.
    pub fn plan(
        &self,
        values: &StatValues,
        options: &OverlayOptions,
    ) -> (Vec<OverlayItem>, OverlayLayout) {
        let items = build_items(values, &options.selected_fields);
        let layout = plan(&items, options, self.measurer.as_ref());
        (items, layout)
    }

    /// Compose the stat box for an `image_w` x `image_h` canvas.
    ///
    /// Every command stays inside the returned [`RenderResult`].
    pub fn compose(
        &self,
        image_w: u32,
        image_h: u32,
        values: &StatValues,
        options: &OverlayOptions,
    ) -> OverlayFrame {
        let (items, layout) = self.plan(values, options);
        let (x, y) = anchor(image_w, image_h, layout.width, layout.height, options.position);
        let result = RenderResult {
            width: layout.width,
            height: layout.height,
            x,
            y,
        };

        let mut commands = Vec::with_capacity(1 + 2 * items.len());
        if options.background_mode == BackgroundMode::Dark {
            let m = &layout.metrics;
            let radius = m
                .corner_radius
                .min(layout.width as f32 / 2.0)
                .min(layout.height as f32 / 2.0)
                .max(0.0);
            commands.push(DrawCommand::RoundedRect(RoundedRectCommand {
                x,
                y,
                width: layout.width,
                height: layout.height,
                radius: radius.floor() as u32,
                color: options.secondary_color,
                opacity: options.effective_background_opacity(),
            }));
        }

        let painter = ItemPainter {
            layout: &layout,
            options,
            values,
            box_x: x as f32,
            box_y: y as f32,
        };
        for (slot, &index) in layout.grid_items.iter().enumerate() {
            if let Some(item) = items.get(index) {
                painter.paint_cell(slot, item, &mut commands);
            }
        }
        if let Some(map) = layout.side_map {
            let line = project_mini_map(
                &values.route_points,
                painter.box_x + map.x,
                painter.box_y + map.y,
                map.size,
                map.size,
                options.primary_color,
            );
            commands.extend(line.map(DrawCommand::Polyline));
        }

        log::debug!(
            "composed overlay: {} commands in {}x{} at ({}, {})",
            commands.len(),
            result.width,
            result.height,
            result.x,
            result.y
        );
        OverlayFrame { commands, result }
    }
}

struct ItemPainter<'a> {
    layout: &'a OverlayLayout,
    options: &'a OverlayOptions,
    values: &'a StatValues,
    box_x: f32,
    box_y: f32,
}

impl ItemPainter<'_> {
    fn paint_cell(&self, slot: usize, item: &OverlayItem, out: &mut Vec<DrawCommand>) {
        let grid = &self.layout.grid;
        let Some(&cell) = grid.assignments.get(slot) else {
            return;
        };
        let m = &self.layout.metrics;
        let align = self.options.text_align;
        let anchor_x = self.box_x + self.layout.grid_x + grid.anchor_x(cell, align);
        let top = self.box_y + self.layout.grid_y + grid.cell_top(cell);
        let body_top = top + m.label_font_px + m.label_gap;

        out.push(self.text(
            anchor_x,
            top,
            item.label(),
            m.label_style(&self.layout.font_family),
            LABEL_OPACITY,
        ));
        match item {
            OverlayItem::Text { value, .. } => out.push(self.text(
                anchor_x,
                body_top,
                value,
                m.value_style(&self.layout.font_family),
                1.0,
            )),
            OverlayItem::RouteMap => {
                let size = m.map_size;
                let map_x = match align {
                    TextAlign::Left => anchor_x,
                    TextAlign::Center => anchor_x - size / 2.0,
                    TextAlign::Right => anchor_x - size,
                };
                let line = project_mini_map(
                    &self.values.route_points,
                    map_x,
                    body_top,
                    size,
                    size,
                    self.options.primary_color,
                );
                out.extend(line.map(DrawCommand::Polyline));
            }
        }
    }

    fn text(
        &self,
        x: f32,
        y: f32,
        text: &str,
        style: ResolvedTextStyle,
        opacity: f32,
    ) -> DrawCommand {
        DrawCommand::Text(TextCommand {
            x: x.round() as i32,
            y: y.round() as i32,
            align: self.options.text_align,
            text: text.to_owned(),
            style,
            color: self.options.primary_color,
            opacity,
        })
    }
}
