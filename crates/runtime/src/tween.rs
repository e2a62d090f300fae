//! Scalar tweens keyed by target.
//!
//! At most one tween runs per key: starting a new one replaces the in-flight one, so the
//! newest target always wins. Callers read the sampled values after each `advance` and
//! write them to whatever the key addresses.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
}

impl Easing {
    /// Maps progress `t` in `[0, 1]` to eased progress.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadraticIn => t * t,
            Easing::QuadraticOut => t * (2.0 - t),
            Easing::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tween {
    pub from: f64,
    pub to: f64,
    pub duration_s: f64,
    pub easing: Easing,
    elapsed_s: f64,
}

impl Tween {
    pub fn new(from: f64, to: f64, duration_s: f64, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration_s: duration_s.max(0.0),
            easing,
            elapsed_s: 0.0,
        }
    }

    pub fn progress(&self) -> f64 {
        if self.duration_s <= 0.0 {
            return 1.0;
        }
        (self.elapsed_s / self.duration_s).clamp(0.0, 1.0)
    }

    pub fn value(&self) -> f64 {
        let p = self.progress();
        if p >= 1.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * self.easing.apply(p)
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TweenSample<K> {
    pub key: K,
    pub value: f64,
    pub finished: bool,
}

#[derive(Debug)]
pub struct Tweens<K> {
    active: HashMap<K, Tween>,
    // Insertion order for deterministic sample order.
    order: Vec<K>,
}

impl<K> Default for Tweens<K> {
    fn default() -> Self {
        Self {
            active: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> Tweens<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `tween` on `key`. Returns the tween it preempted, if any.
    pub fn start(&mut self, key: K, tween: Tween) -> Option<Tween> {
        let previous = self.active.insert(key.clone(), tween);
        if previous.is_some() {
            self.order.retain(|k| *k != key);
        }
        self.order.push(key);
        previous
    }

    pub fn cancel(&mut self, key: &K) -> Option<Tween> {
        let removed = self.active.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    pub fn get(&self, key: &K) -> Option<&Tween> {
        self.active.get(key)
    }

    pub fn is_active(&self, key: &K) -> bool {
        self.active.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Drops every tween whose key fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.active.retain(|k, _| keep(k));
        let active = &self.active;
        self.order.retain(|k| active.contains_key(k));
    }

    /// Steps every tween by `dt_s` and returns the new values. Finished tweens report
    /// their end value once and are then dropped.
    pub fn advance(&mut self, dt_s: f64) -> Vec<TweenSample<K>> {
        let dt_s = if dt_s.is_finite() { dt_s.max(0.0) } else { 0.0 };
        let mut samples = Vec::with_capacity(self.order.len());
        for key in &self.order {
            let Some(tween) = self.active.get_mut(key) else {
                continue;
            };
            tween.elapsed_s += dt_s;
            samples.push(TweenSample {
                key: key.clone(),
                value: tween.value(),
                finished: tween.is_finished(),
            });
        }

        for sample in &samples {
            if sample.finished {
                self.active.remove(&sample.key);
            }
        }
        let active = &self.active;
        self.order.retain(|k| active.contains_key(k));
        samples
    }
}
