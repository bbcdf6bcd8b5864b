use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricId {
    V,
    N,
    S,
    #[serde(rename = "D_f")]
    FractalDimension,
}

/// One row of the decorative metric table shown above the canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    pub id: MetricId,
    pub name: String,
    pub value: f64,
    pub target: f64,
    pub formula: String,
}

impl Metric {
    fn new(id: MetricId, name: &str, value: f64, target: f64, formula: &str) -> Self {
        Metric {
            id,
            name: name.to_string(),
            value,
            target,
            formula: formula.to_string(),
        }
    }
}

/// Starting values of the four tracked metrics.
pub fn initial_metrics() -> Vec<Metric> {
    vec![
        Metric::new(MetricId::V, "Solution Value", 0.9992, 0.999, "V = 1 - C_val / (G_S * R_T)"),
        Metric::new(MetricId::N, "Structural Order", 0.9981, 0.998, "N = 1 - S"),
        Metric::new(MetricId::S, "Workflow Entropy", 0.0012, 0.001, "S = -∑(p_i * log(p_i))"),
        Metric::new(
            MetricId::FractalDimension,
            "Fractal Complexity",
            9.0003,
            9.000,
            "D_f = lim(ε→0) log(N(ε))/log(1/ε)",
        ),
    ]
}

/// Adds `delta` to the metric with the given id. Missing ids are ignored.
pub fn nudge(metrics: &mut [Metric], id: MetricId, delta: f64) {
    if let Some(metric) = metrics.iter_mut().find(|m| m.id == id) {
        metric.value += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_metrics_cover_all_ids() {
        let ids: Vec<MetricId> = initial_metrics().iter().map(|m| m.id).collect();
        assert_eq!(
            ids,
            vec![MetricId::V, MetricId::N, MetricId::S, MetricId::FractalDimension]
        );
    }

    #[test]
    fn test_nudge_only_touches_named_metric() {
        let mut metrics = initial_metrics();
        nudge(&mut metrics, MetricId::FractalDimension, 0.001);

        let fractal = metrics.iter().find(|m| m.id == MetricId::FractalDimension).unwrap();
        assert!((fractal.value - 9.0013).abs() < 1e-9);
        assert_eq!(metrics[0].value, 0.9992);
    }

    #[test]
    fn test_fractal_id_wire_name() {
        assert_eq!(serde_json::to_string(&MetricId::FractalDimension).unwrap(), "\"D_f\"");
    }
}
