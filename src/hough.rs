//! Progressive probabilistic Hough transform.
//!
//! Edge pixels are drawn in random order and vote into a (theta, rho)
//! accumulator. As soon as a bin reaches the vote threshold, the corridor along
//! that line is walked in both directions from the seed pixel, bridging at most
//! `max_line_gap` missing pixels. The walk is then repeated along the
//! direction of a least-squares fit to the edge pixels around it, so runs are
//! not cut short by the one-degree bin quantization. Long enough runs become
//! segments with their ends projected onto the fitted line; their pixels are
//! removed from the pool and their votes withdrawn, so one physical line is
//! reported once.
//!
//! The visiting order comes from a seeded generator, making the output a pure
//! function of the edge map and the configuration.

use nalgebra::{Matrix2, SymmetricEigen};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::LineConfig;
use crate::detection::EdgeMap;
use crate::geometry::LineSegment;

/// Fixed-point shift used while walking along a candidate line
const SHIFT: u32 = 16;

/// Re-walks along a fitted direction after the initial bin-direction walk
const REFINE_PASSES: usize = 3;

/// Half-width, in pixels, of the band around the path used for fitting
const REFINE_BAND: i64 = 1;

struct Accumulator {
    votes: Vec<i32>,
    num_rho: usize,
    /// (cos, sin) of every theta bin, pre-divided by the rho resolution
    trig: Vec<(f64, f64)>,
}

impl Accumulator {
    fn new(width: u32, height: u32, config: &LineConfig) -> Self {
        let num_angle = ((std::f64::consts::PI / config.theta).round() as usize).max(1);
        let num_rho = ((((width + height) * 2 + 1) as f64 / config.rho).round() as usize).max(1);
        let inv_rho = 1.0 / config.rho;

        let trig = (0..num_angle)
            .map(|n| {
                let angle = n as f64 * config.theta;
                (angle.cos() * inv_rho, angle.sin() * inv_rho)
            })
            .collect();

        Self {
            votes: vec![0; num_angle * num_rho],
            num_rho,
            trig,
        }
    }

    fn rho_index(&self, n: usize, x: i64, y: i64) -> usize {
        let (cos, sin) = self.trig[n];
        let r = (x as f64 * cos + y as f64 * sin).round() as i64;
        (r + (self.num_rho as i64 - 1) / 2) as usize
    }

    /// Add the votes of one pixel; returns the strongest bin it touched
    fn vote(&mut self, x: i64, y: i64) -> (usize, i32) {
        let mut best = (0, i32::MIN);
        for n in 0..self.trig.len() {
            let idx = n * self.num_rho + self.rho_index(n, x, y);
            self.votes[idx] += 1;
            if self.votes[idx] > best.1 {
                best = (n, self.votes[idx]);
            }
        }
        best
    }

    fn withdraw(&mut self, x: i64, y: i64) {
        for n in 0..self.trig.len() {
            let idx = n * self.num_rho + self.rho_index(n, x, y);
            self.votes[idx] -= 1;
        }
    }
}

/// Fixed-point walker along a line direction
#[derive(Clone, Copy)]
struct Walk {
    x: i64,
    y: i64,
    dx: i64,
    dy: i64,
    /// x is the integer axis (mostly horizontal line)
    x_major: bool,
}

impl Walk {
    fn from_seed(x: i64, y: i64, direction: (f64, f64)) -> Self {
        let (a, b) = direction;
        let one = (1i64 << SHIFT) as f64;
        let half = 1i64 << (SHIFT - 1);

        if a.abs() > b.abs() {
            Self {
                x,
                y: (y << SHIFT) + half,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one / a.abs()).round() as i64,
                x_major: true,
            }
        } else {
            Self {
                x: (x << SHIFT) + half,
                y,
                dx: (a * one / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
                x_major: false,
            }
        }
    }

    fn reversed(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
            ..self
        }
    }

    fn pixel(&self) -> (i64, i64) {
        if self.x_major {
            (self.x, self.y >> SHIFT)
        } else {
            (self.x >> SHIFT, self.y)
        }
    }

    fn advance(&mut self) {
        self.x += self.dx;
        self.y += self.dy;
    }
}

struct PixelPool {
    mask: Vec<bool>,
    width: i64,
    height: i64,
}

impl PixelPool {
    fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    fn is_set(&self, x: i64, y: i64) -> bool {
        self.mask[(y * self.width + x) as usize]
    }

    fn clear(&mut self, x: i64, y: i64) {
        self.mask[(y * self.width + x) as usize] = false;
    }
}

/// Total least-squares line through a set of pixels
struct LineFit {
    cx: f64,
    cy: f64,
    ux: f64,
    uy: f64,
}

impl LineFit {
    fn through(points: &[(i64, i64)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let cx = points.iter().map(|p| p.0 as f64).sum::<f64>() / n;
        let cy = points.iter().map(|p| p.1 as f64).sum::<f64>() / n;

        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for &(x, y) in points {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }

        // Principal axis of the scatter
        let eig = SymmetricEigen::new(Matrix2::new(sxx, sxy, sxy, syy) / n);
        let major = if eig.eigenvalues[0] >= eig.eigenvalues[1] { 0 } else { 1 };
        if !(eig.eigenvalues[major] > 0.0) {
            return None;
        }
        let axis = eig.eigenvectors.column(major).normalize();

        Some(Self {
            cx,
            cy,
            ux: axis[0],
            uy: axis[1],
        })
    }

    fn direction(&self) -> (f64, f64) {
        (self.ux, self.uy)
    }

    fn project(&self, (x, y): (i64, i64)) -> (i64, i64) {
        let t = (x as f64 - self.cx) * self.ux + (y as f64 - self.cy) * self.uy;
        (
            (self.cx + t * self.ux).round() as i64,
            (self.cy + t * self.uy).round() as i64,
        )
    }
}

/// Walk both ways from the seed, bridging up to `max_gap` misses. Returns the
/// last set pixel reached in each direction.
fn trace(pool: &PixelPool, start: Walk, max_gap: i64) -> [(i64, i64); 2] {
    let mut ends = [start.pixel(); 2];
    for (k, end) in ends.iter_mut().enumerate() {
        let mut walk = if k == 0 { start } else { start.reversed() };
        let mut gap = 0;
        loop {
            let (x, y) = walk.pixel();
            if !pool.contains(x, y) {
                break;
            }
            if pool.is_set(x, y) {
                gap = 0;
                *end = (x, y);
            } else {
                gap += 1;
                if gap > max_gap {
                    break;
                }
            }
            walk.advance();
        }
    }
    ends
}

/// Pixels on the walk path from the seed out to both ends
fn path(pool: &PixelPool, start: Walk, ends: &[(i64, i64); 2]) -> Vec<(i64, i64)> {
    let mut pixels = Vec::new();
    for (k, &end) in ends.iter().enumerate() {
        let mut walk = if k == 0 { start } else { start.reversed() };
        loop {
            let (x, y) = walk.pixel();
            if !pool.contains(x, y) {
                break;
            }
            pixels.push((x, y));
            if (x, y) == end {
                break;
            }
            walk.advance();
        }
    }
    pixels
}

/// Set pixels within `REFINE_BAND` of the path, across its minor axis
fn band_pixels(pool: &PixelPool, start: Walk, ends: &[(i64, i64); 2]) -> Vec<(i64, i64)> {
    let mut pixels = Vec::new();
    for (x, y) in path(pool, start, ends) {
        for offset in -REFINE_BAND..=REFINE_BAND {
            let (bx, by) = if start.x_major {
                (x, y + offset)
            } else {
                (x + offset, y)
            };
            if pool.contains(bx, by) && pool.is_set(bx, by) {
                pixels.push((bx, by));
            }
        }
    }
    pixels.sort_unstable();
    pixels.dedup();
    pixels
}

/// Extract straight segments from an edge map.
///
/// Returns `None` when no segment satisfies the vote threshold and length
/// constraints. The order of the returned segments carries no meaning.
pub fn extract_segments(edges: &EdgeMap, config: &LineConfig) -> Option<Vec<LineSegment>> {
    let (width, height) = edges.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let mut pool = PixelPool {
        mask: vec![false; width as usize * height as usize],
        width: width as i64,
        height: height as i64,
    };
    let mut points = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if edges.is_edge(x, y) {
                pool.mask[(y * width + x) as usize] = true;
                points.push((x as i64, y as i64));
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    points.shuffle(&mut rng);

    let mut accumulator = Accumulator::new(width, height, config);
    let threshold = i32::try_from(config.vote_threshold).unwrap_or(i32::MAX);
    let min_length = config.min_line_length as i64;
    let max_gap = config.max_line_gap as i64;
    let mut segments = Vec::new();

    for &(px, py) in &points {
        // Already consumed by an earlier segment
        if !pool.is_set(px, py) {
            continue;
        }

        let (best_n, best_votes) = accumulator.vote(px, py);
        if best_votes < threshold {
            continue;
        }

        // Line direction is perpendicular to the bin's normal
        let (cos, sin) = accumulator.trig[best_n];
        let first = Walk::from_seed(px, py, (-sin, cos));
        let mut walks = vec![(first, trace(&pool, first, max_gap))];

        // The bin direction is quantized to the theta step; re-walk from the
        // seed along the direction fitted to the pixels around the corridor
        for _ in 0..REFINE_PASSES {
            let (walk, ends) = walks[walks.len() - 1];
            let Some(fit) = LineFit::through(&band_pixels(&pool, walk, &ends)) else {
                break;
            };
            let walk = Walk::from_seed(px, py, fit.direction());
            walks.push((walk, trace(&pool, walk, max_gap)));
        }

        let (walk, ends) = walks[walks.len() - 1];
        let accepted = (ends[1].0 - ends[0].0).abs() >= min_length
            || (ends[1].1 - ends[0].1).abs() >= min_length;
        let fit = if accepted {
            LineFit::through(&band_pixels(&pool, walk, &ends))
        } else {
            None
        };

        // Consume the corridor; votes are withdrawn only for accepted runs,
        // and a rejected candidate only gives up its first walk
        let consumed = if accepted { walks.len() } else { 1 };
        for (walk, ends) in &walks[..consumed] {
            for (x, y) in path(&pool, *walk, ends) {
                if pool.is_set(x, y) {
                    if accepted {
                        accumulator.withdraw(x, y);
                    }
                    pool.clear(x, y);
                }
            }
        }
        pool.clear(px, py);

        if accepted {
            let [a, b] = match &fit {
                Some(fit) => [fit.project(ends[0]), fit.project(ends[1])],
                None => ends,
            };
            segments.push(LineSegment::new(a.0 as i32, a.1 as i32, b.0 as i32, b.1 as i32));
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}
