//! Scenes: what the observer sees, as `(label, distance)` observations.
//!
//! A [`SceneList`] is a sequence of scenes stored in a whitespace-separated
//! text file:
//!
//! ```text
//! 2
//!
//! 0
//! 2
//!        Box 0.3
//!     Carton 0.3
//!
//! 1
//! 1
//!        Cup 0.41
//! ```
//!
//! The first token is the scene count; every scene is an index, an object
//! count, and that many `name distance` pairs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::Category;
use crate::error::SceneError;

/// Result type for scene operations.
pub type SceneResult<T> = std::result::Result<T, SceneError>;

/// One observed object: a category label and its distance from the observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub label: String,
    pub distance: f64,
}

impl Observation {
    pub fn new(label: impl Into<String>, distance: f64) -> Self {
        Self {
            label: label.into(),
            distance,
        }
    }
}

/// An ordered collection of observations. Labels may repeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    observations: Vec<Observation>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scene from `(label, distance)` pairs.
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self {
            observations: pairs
                .into_iter()
                .map(|(label, distance)| Observation::new(label, distance))
                .collect(),
        }
    }

    /// One instance of every catalog category at unit distance.
    pub fn one_of_each() -> Self {
        Self::from_pairs(Category::ALL.iter().map(|c| (c.name(), 1.0)))
    }

    pub fn push(&mut self, label: impl Into<String>, distance: f64) {
        self.observations.push(Observation::new(label, distance));
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observations ordered by ascending distance. Equal distances keep
    /// their scene order.
    pub fn sorted_by_distance(&self) -> Vec<&Observation> {
        let mut sorted: Vec<&Observation> = self.observations.iter().collect();
        sorted.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        sorted
    }
}

impl FromIterator<Observation> for Scene {
    fn from_iter<T: IntoIterator<Item = Observation>>(iter: T) -> Self {
        Self {
            observations: iter.into_iter().collect(),
        }
    }
}

/// A sequence of scenes, as stored in a scene-list file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneList {
    scenes: Vec<Scene>,
}

impl SceneList {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Scene at a zero-based index.
    pub fn get(&self, index: usize) -> SceneResult<&Scene> {
        self.scenes.get(index).ok_or(SceneError::IndexOutOfRange {
            index,
            len: self.scenes.len(),
        })
    }

    pub fn push(&mut self, scene: Scene) {
        self.scenes.push(scene);
    }

    /// Parse the scene-list text format. Any problem fails the whole parse.
    pub fn parse(text: &str) -> SceneResult<Self> {
        let mut tokens = Tokens::new(text);

        let expected = tokens.count("scene count")?;
        let mut scenes = Vec::new();

        for found in 0..expected {
            if tokens.is_exhausted() {
                return Err(SceneError::Truncated { expected, found });
            }
            let _index = tokens.count("scene index")?;
            let objects = tokens.count("object count")?;

            let mut scene = Scene::new();
            for _ in 0..objects {
                let (line, label) = tokens.next("object name")?;
                let (dline, raw) = tokens.next("object distance")?;
                let distance: f64 = raw.parse().map_err(|_| SceneError::Malformed {
                    line: dline,
                    message: format!("distance \"{raw}\" for \"{label}\" is not a number"),
                })?;
                if !(distance.is_finite() && distance > 0.0) {
                    return Err(SceneError::NonPositiveDistance {
                        line,
                        label: label.to_string(),
                        distance,
                    });
                }
                scene.push(label, distance);
            }
            scenes.push(scene);
        }

        if let Some((line, extra)) = tokens.peek() {
            return Err(SceneError::Malformed {
                line,
                message: format!("unexpected trailing token \"{extra}\""),
            });
        }

        Ok(Self { scenes })
    }

    /// Render the scene-list text format.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n\n", self.scenes.len());
        for (index, scene) in self.scenes.iter().enumerate() {
            out.push_str(&format!("{index}\n{}\n", scene.len()));
            for obs in scene.observations() {
                out.push_str(&format!("{:>10} {}\n", obs.label, obs.distance));
            }
            out.push('\n');
        }
        out
    }

    /// Load and parse a scene-list file.
    pub fn load(path: &Path) -> SceneResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let list = Self::parse(&text)?;
        tracing::info!(path = %path.display(), scenes = list.len(), "scene list loaded");
        Ok(list)
    }

    /// Write the scene list, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> SceneResult<()> {
        let io_err = |source| SceneError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.render()).map_err(io_err)?;
        tracing::info!(path = %path.display(), scenes = self.len(), "scene list saved");
        Ok(())
    }
}

/// Whitespace tokens tagged with their 1-based line number.
struct Tokens<'a> {
    inner: std::iter::Peekable<std::vec::IntoIter<(usize, &'a str)>>,
    last_line: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        let tokens: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .flat_map(|(i, line)| line.split_whitespace().map(move |t| (i + 1, t)))
            .collect();
        let last_line = text.lines().count().max(1);
        Self {
            inner: tokens.into_iter().peekable(),
            last_line,
        }
    }

    fn is_exhausted(&mut self) -> bool {
        self.inner.peek().is_none()
    }

    fn peek(&mut self) -> Option<(usize, &'a str)> {
        self.inner.peek().copied()
    }

    fn next(&mut self, what: &str) -> SceneResult<(usize, &'a str)> {
        self.inner.next().ok_or_else(|| SceneError::Malformed {
            line: self.last_line,
            message: format!("missing {what}"),
        })
    }

    fn count(&mut self, what: &str) -> SceneResult<usize> {
        let (line, raw) = self.next(what)?;
        raw.parse().map_err(|_| SceneError::Malformed {
            line,
            message: format!("{what} \"{raw}\" is not a non-negative integer"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "2\n\n0\n2\n       Box 0.3\n    Carton 0.3\n\n1\n1\n       Cup 0.41\n\n";

    #[test]
    fn sorted_by_distance_is_stable() {
        let scene = Scene::from_pairs([("Cup", 0.5), ("Box", 0.3), ("Carton", 0.3)]);
        let labels: Vec<&str> = scene
            .sorted_by_distance()
            .iter()
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(labels, ["Box", "Carton", "Cup"]);
    }

    #[test]
    fn one_of_each_covers_catalog() {
        let scene = Scene::one_of_each();
        assert_eq!(scene.len(), Category::COUNT);
        assert!(scene.observations().iter().all(|o| o.distance == 1.0));
    }

    #[test]
    fn absurd_scene_count_is_truncated_not_allocated() {
        let text = format!("{}\n0\n1\nBox 0.3\n", usize::MAX);
        assert!(matches!(
            SceneList::parse(&text),
            Err(SceneError::Truncated { expected: usize::MAX, found: 1 })
        ));
    }

    #[test]
    fn parse_sample_list() {
        let list = SceneList::parse(SAMPLE).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(
            list.get(0).unwrap().observations(),
            &[Observation::new("Box", 0.3), Observation::new("Carton", 0.3)]
        );
        assert_eq!(list.get(1).unwrap().len(), 1);
        assert!(matches!(
            list.get(2),
            Err(SceneError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn render_then_parse_round_trips() {
        let list = SceneList::parse(SAMPLE).unwrap();
        assert_eq!(SceneList::parse(&list.render()).unwrap(), list);
    }

    #[test]
    fn truncated_list_is_rejected() {
        let err = SceneList::parse("3\n0\n1\nBox 0.3\n").unwrap_err();
        assert!(matches!(err, SceneError::Truncated { expected: 3, found: 1 }));
    }

    #[test]
    fn bad_distances_are_rejected_with_line_numbers() {
        let err = SceneList::parse("1\n0\n1\nBox -0.3\n").unwrap_err();
        assert!(matches!(err, SceneError::NonPositiveDistance { line: 4, .. }));

        let err = SceneList::parse("1\n0\n1\nBox near\n").unwrap_err();
        assert!(matches!(err, SceneError::Malformed { line: 4, .. }));
    }

    #[test]
    fn missing_counts_are_rejected() {
        assert!(matches!(
            SceneList::parse("two\n"),
            Err(SceneError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            SceneList::parse("1\n0\n2\nBox 0.3\n"),
            Err(SceneError::Malformed { .. })
        ));
    }
}
