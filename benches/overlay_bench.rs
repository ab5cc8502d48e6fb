use std::alloc::{GlobalAlloc, Layout, System};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use activity_overlay::{decode_activity, format_stats, UnitSystem};
use activity_overlay_embedded_graphics::{
    embedded_composer, render_route, EgRenderConfig, EgRenderer, RgbCanvas,
};
use activity_overlay_render::{LayoutMode, MapPosition, OverlayOptions, RouteOptions};
use embedded_graphics::pixelcolor::Rgb888;

const IMAGE_WIDTH: u32 = 2048;
const IMAGE_HEIGHT: u32 = 1536;

const FIXTURES: &[(&str, &str)] = &[
    ("evening-loop-gpx", "tests/fixtures/evening_loop.gpx"),
    ("tempo-run-tcx", "tests/fixtures/tempo_run.tcx"),
];

struct TrackingAllocator;

static CURRENT_ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);
static PEAK_ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL_ALLOCATOR: TrackingAllocator = TrackingAllocator;

fn current_alloc_bytes() -> usize {
    CURRENT_ALLOC_BYTES.load(Ordering::Relaxed)
}

fn peak_alloc_bytes() -> usize {
    PEAK_ALLOC_BYTES.load(Ordering::Relaxed)
}

fn reset_peak_alloc_bytes() {
    PEAK_ALLOC_BYTES.store(current_alloc_bytes(), Ordering::Relaxed);
}

fn add_current_alloc_bytes(delta: usize) {
    let current = CURRENT_ALLOC_BYTES.fetch_add(delta, Ordering::Relaxed) + delta;
    PEAK_ALLOC_BYTES.fetch_max(current, Ordering::Relaxed);
}

fn sub_current_alloc_bytes(delta: usize) {
    let _ = CURRENT_ALLOC_BYTES.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_sub(delta))
    });
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            add_current_alloc_bytes(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        sub_current_alloc_bytes(layout.size());
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            add_current_alloc_bytes(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            if new_size >= layout.size() {
                add_current_alloc_bytes(new_size - layout.size());
            } else {
                sub_current_alloc_bytes(layout.size() - new_size);
            }
        }
        new_ptr
    }
}

#[derive(Clone, Debug)]
struct CaseResult {
    fixture: String,
    case: String,
    iterations: usize,
    min_ns: u128,
    median_ns: u128,
    max_ns: u128,
    median_peak_heap_bytes: usize,
}

fn median<T: Copy>(sorted: &[T]) -> T {
    sorted[sorted.len() / 2]
}

fn run_case<F>(
    fixture: &str,
    case: &str,
    warmup_iters: usize,
    measure_iters: usize,
    mut op: F,
) -> CaseResult
where
    F: FnMut() -> usize,
{
    for _ in 0..warmup_iters {
        black_box(op());
    }

    let mut time_samples = Vec::with_capacity(measure_iters);
    let mut mem_samples = Vec::with_capacity(measure_iters);
    for _ in 0..measure_iters {
        let baseline_alloc = current_alloc_bytes();
        reset_peak_alloc_bytes();
        let start = Instant::now();
        black_box(op());
        time_samples.push(start.elapsed().as_nanos());
        mem_samples.push(peak_alloc_bytes().saturating_sub(baseline_alloc));
    }
    time_samples.sort_unstable();
    mem_samples.sort_unstable();

    CaseResult {
        fixture: fixture.to_string(),
        case: case.to_string(),
        iterations: measure_iters,
        min_ns: time_samples[0],
        median_ns: median(&time_samples),
        max_ns: time_samples[time_samples.len() - 1],
        median_peak_heap_bytes: median(&mem_samples),
    }
}

fn main() {
    let quick = std::env::args().any(|arg| arg == "--quick");
    let warmup_iters = if quick { 1 } else { 3 };
    let measure_iters = if quick { 3 } else { 15 };

    println!("# activity-overlay benchmark");
    println!(
        "# mode={} warmup_iters={} measure_iters={} image={}x{}",
        if quick { "quick" } else { "full" },
        warmup_iters,
        measure_iters,
        IMAGE_WIDTH,
        IMAGE_HEIGHT
    );
    println!("fixture,case,iterations,min_ns,median_ns,max_ns,median_peak_heap_bytes");

    let renderer = EgRenderer::new(EgRenderConfig::default());
    let composer = embedded_composer();
    let options = OverlayOptions {
        layout_mode: LayoutMode::Auto,
        map_position: MapPosition::Left,
        ..OverlayOptions::default()
    };
    let route_options = RouteOptions::default();
    let background = RgbCanvas::new(IMAGE_WIDTH, IMAGE_HEIGHT, Rgb888::new(60, 80, 100));

    let mut results = Vec::new();
    for (fixture_key, fixture_path) in FIXTURES {
        let bytes =
            std::fs::read(fixture_path).unwrap_or_else(|e| panic!("read {}: {}", fixture_path, e));
        let raw = decode_activity(&bytes).unwrap_or_else(|e| panic!("decode failed: {}", e));
        let values = format_stats(&raw, UnitSystem::Metric);

        results.push(run_case(
            fixture_key,
            "decode_and_format",
            warmup_iters,
            measure_iters,
            || {
                let raw =
                    decode_activity(&bytes).unwrap_or_else(|e| panic!("decode failed: {}", e));
                format_stats(&raw, UnitSystem::Metric).route_points.len()
            },
        ));

        results.push(run_case(
            fixture_key,
            "compose_overlay",
            warmup_iters,
            measure_iters,
            || {
                composer
                    .compose(IMAGE_WIDTH, IMAGE_HEIGHT, &values, &options)
                    .commands
                    .len()
            },
        ));

        results.push(run_case(
            fixture_key,
            "render_overlay",
            warmup_iters,
            measure_iters,
            || {
                let mut canvas = background.clone();
                let frame = composer.compose(IMAGE_WIDTH, IMAGE_HEIGHT, &values, &options);
                match renderer.render_frame(&frame, &mut canvas) {
                    Ok(result) => result.width as usize,
                    Err(never) => match never {},
                }
            },
        ));

        results.push(run_case(
            fixture_key,
            "render_full_frame_route",
            warmup_iters,
            measure_iters,
            || {
                let mut canvas = background.clone();
                match render_route(&mut canvas, &values.route_points, &route_options) {
                    Ok(drawn) => usize::from(drawn),
                    Err(never) => match never {},
                }
            },
        ));
    }

    for result in &results {
        println!(
            "{},{},{},{},{},{},{}",
            result.fixture,
            result.case,
            result.iterations,
            result.min_ns,
            result.median_ns,
            result.max_ns,
            result.median_peak_heap_bytes
        );
    }
}
