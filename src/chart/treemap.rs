use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::filter::FilteredView;
use crate::data::model::{CellValue, Passenger};

/// Color carried by a treemap node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NodeColor {
    /// No color variable.
    None,
    /// Every passenger under the node shares this category.
    Category(CellValue),
    /// Passengers under the node disagree on the category.
    Mixed,
    /// Measure-weighted mean of a numeric color variable.
    Scale(f64),
}

/// One rectangle of the hierarchy with its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub label: String,
    pub value: f64,
    pub color: NodeColor,
    pub children: Vec<TreeNode>,
}

#[derive(Clone, Copy)]
enum ColorMode<'a> {
    None,
    Categorical(&'a str),
    Numeric(&'a str),
}

/// Group the view along `path`, summing `measure` at every level.
pub fn build_tree(
    view: &FilteredView,
    path: &[&str],
    measure: &str,
    color: Option<&str>,
) -> TreeNode {
    let rows: Vec<&Passenger> = view.iter().collect();
    let mode = match color {
        None => ColorMode::None,
        Some(col) => {
            let numeric = rows
                .iter()
                .map(|p| p.value(col))
                .filter(|v| !v.is_null())
                .all(|v| v.as_f64().is_some());
            if numeric {
                ColorMode::Numeric(col)
            } else {
                ColorMode::Categorical(col)
            }
        }
    };
    node("", &rows, path, measure, mode)
}

fn node(label: &str, rows: &[&Passenger], path: &[&str], measure: &str, mode: ColorMode) -> TreeNode {
    let children = match path.split_first() {
        None => Vec::new(),
        Some((level, rest)) => {
            let mut groups: BTreeMap<&CellValue, Vec<&Passenger>> = BTreeMap::new();
            for &p in rows {
                groups.entry(p.value(level)).or_default().push(p);
            }
            groups
                .into_iter()
                .map(|(key, members)| node(&key.to_string(), &members, rest, measure, mode))
                .collect()
        }
    };
    TreeNode {
        label: label.to_string(),
        value: rows.iter().filter_map(|p| p.value(measure).as_f64()).sum(),
        color: node_color(rows, measure, mode),
        children,
    }
}

fn node_color(rows: &[&Passenger], measure: &str, mode: ColorMode) -> NodeColor {
    match mode {
        ColorMode::None => NodeColor::None,
        ColorMode::Categorical(col) => {
            let mut values = rows.iter().map(|p| p.value(col));
            match values.next() {
                Some(first) if values.all(|v| v == first) => NodeColor::Category(first.clone()),
                Some(_) => NodeColor::Mixed,
                None => NodeColor::None,
            }
        }
        ColorMode::Numeric(col) => {
            let pairs: Vec<(f64, f64)> = rows
                .iter()
                .filter_map(|p| {
                    let c = p.value(col).as_f64()?;
                    let w = p.value(measure).as_f64().unwrap_or(0.0);
                    Some((c, w))
                })
                .collect();
            if pairs.is_empty() {
                return NodeColor::None;
            }
            let weight: f64 = pairs.iter().map(|(_, w)| w).sum();
            let mean = if weight > 0.0 {
                pairs.iter().map(|(c, w)| c * w).sum::<f64>() / weight
            } else {
                pairs.iter().map(|(c, _)| c).sum::<f64>() / pairs.len() as f64
            };
            NodeColor::Scale(mean)
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// A laid-out rectangle. `depth` 1 is the first path level.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub depth: usize,
    pub label: String,
    pub value: f64,
    pub color: NodeColor,
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl TreeNode {
    /// Slice-and-dice layout of the descendants inside `[min, max]`,
    /// parents before their children. Nodes without area are skipped.
    pub fn layout(&self, min: [f64; 2], max: [f64; 2]) -> Vec<Tile> {
        let mut tiles = Vec::new();
        slice(self, 1, min, max, &mut tiles);
        tiles
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(TreeNode::depth).max().unwrap_or(0)
    }
}

fn slice(parent: &TreeNode, depth: usize, min: [f64; 2], max: [f64; 2], out: &mut Vec<Tile>) {
    let total: f64 = parent.children.iter().map(|c| c.value.max(0.0)).sum();
    if total <= 0.0 {
        return;
    }
    // Alternate the split direction per level: x first, then y.
    let axis = (depth - 1) % 2;
    let span = max[axis] - min[axis];
    let mut cursor = min[axis];

    for child in &parent.children {
        let share = child.value.max(0.0) / total;
        if share <= 0.0 {
            continue;
        }
        let (mut cmin, mut cmax) = (min, max);
        cmin[axis] = cursor;
        cursor += span * share;
        cmax[axis] = cursor;

        out.push(Tile {
            depth,
            label: child.label.clone(),
            value: child.value,
            color: child.color.clone(),
            min: cmin,
            max: cmax,
        });
        slice(child, depth + 1, cmin, cmax, out);
    }
}
