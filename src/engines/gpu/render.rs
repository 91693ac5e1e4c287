//! Hand-off from the parallel backend to a visualisation layer.
//!
//! Renderers receive terminal prices and the path count only; pixels,
//! surfaces and colours stay on the renderer's side of this boundary.

use crate::core::FinalPriceBuffer;

/// Default divisor mapping a price onto the vertical axis.
pub const DEFAULT_PRICE_DIVISOR: f32 = 200.0;

/// A lane's terminal price in normalised plot coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotPoint {
    pub x: f32,
    pub y: f32,
}

/// Projects lane `i` to `x = i / n * 2 - 1` and `y = price / divisor - 1`.
pub fn project_points(prices: &[f32], path_count: usize, divisor: f32) -> Vec<PlotPoint> {
    let n = path_count.max(1) as f32;
    prices
        .iter()
        .take(path_count)
        .enumerate()
        .map(|(i, &price)| PlotPoint {
            x: (i as f32 / n) * 2.0 - 1.0,
            y: price / divisor - 1.0,
        })
        .collect()
}

/// Consumer of parallel-backend results.
pub trait ResultRenderer {
    type Output;

    fn render(&mut self, prices: &FinalPriceBuffer, path_count: usize) -> Self::Output;
}

/// Renderer that keeps the projected points, e.g. for export or a point-list draw call.
#[derive(Debug, Clone)]
pub struct PointCloud {
    pub divisor: f32,
    points: Vec<PlotPoint>,
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_DIVISOR)
    }
}

impl PointCloud {
    pub fn new(divisor: f32) -> Self {
        Self {
            divisor,
            points: Vec::new(),
        }
    }

    pub fn points(&self) -> &[PlotPoint] {
        &self.points
    }

    /// Writes `lane,x,y` rows with a header.
    pub fn write_csv<W: std::io::Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "lane,x,y")?;
        for (lane, p) in self.points.iter().enumerate() {
            writeln!(out, "{lane},{},{}", p.x, p.y)?;
        }
        out.flush()
    }
}

impl ResultRenderer for PointCloud {
    type Output = usize;

    /// Replaces the stored points and returns how many were projected.
    fn render(&mut self, prices: &FinalPriceBuffer, path_count: usize) -> usize {
        self.points = project_points(prices.as_slice(), path_count, self.divisor);
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_spans_left_edge_to_just_short_of_right() {
        let points = project_points(&[200.0, 400.0, 0.0, 100.0], 4, 200.0);
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], PlotPoint { x: -1.0, y: 0.0 });
        assert_eq!(points[1], PlotPoint { x: -0.5, y: 1.0 });
        assert_eq!(points[2], PlotPoint { x: 0.0, y: -1.0 });
        assert_eq!(points[3], PlotPoint { x: 0.5, y: -0.5 });
    }

    #[test]
    fn projection_ignores_prices_past_path_count() {
        let points = project_points(&[1.0, 2.0, 3.0], 2, 1.0);
        assert_eq!(points.len(), 2);
    }

    struct FailingFlush(Vec<u8>);

    impl std::io::Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn csv_export_reports_flush_failures() {
        let buffer = FinalPriceBuffer::from_vec(vec![100.0]);
        let mut cloud = PointCloud::default();
        cloud.render(&buffer, 1);
        assert!(cloud.write_csv(FailingFlush(Vec::new())).is_err());
    }

    #[test]
    fn point_cloud_renders_and_exports() {
        let buffer = FinalPriceBuffer::from_vec(vec![100.0, 300.0]);
        let mut cloud = PointCloud::default();
        assert_eq!(cloud.render(&buffer, 2), 2);

        let mut csv = Vec::new();
        cloud.write_csv(&mut csv).unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert_eq!(text, "lane,x,y\n0,-1,-0.5\n1,0,0.5\n");
    }
}
