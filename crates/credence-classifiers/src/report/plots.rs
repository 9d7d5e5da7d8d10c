use plotly::layout::{Axis, Layout};
use plotly::{Bar, HeatMap, Plot};

use crate::stats::{ConfusionMatrix, RankedFeature};

/// Horizontal bar chart of feature importances, largest at the top.
pub fn plot_feature_importances(importances: &[RankedFeature], title: &str) -> Plot {
    let names: Vec<String> = importances.iter().rev().map(|f| f.name.clone()).collect();
    let values: Vec<f64> = importances.iter().rev().map(|f| f.importance).collect();

    let trace = Bar::new(values, names)
        .orientation(plotly::common::Orientation::Horizontal)
        .name("Importance");

    let layout = Layout::new()
        .title(title)
        .height(600)
        .x_axis(Axis::new().title("Mean impurity decrease"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

/// Confusion matrix as a heatmap; rows are true classes.
pub fn plot_confusion(confusion: &ConfusionMatrix, title: &str) -> Plot {
    let labels = vec!["bad".to_string(), "good".to_string()];
    let z: Vec<Vec<usize>> = confusion.counts.iter().map(|row| row.to_vec()).collect();

    let trace = HeatMap::new(labels.clone(), labels, z);

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Predicted"))
        .y_axis(Axis::new().title("True"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}
