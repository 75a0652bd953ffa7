// SPDX-License-Identifier: CEPL-1.0
//! Device scoring and selection.
use std::cmp::Ordering;

use tracing::{debug, info, warn};

use crate::desc::DeviceReport;
use crate::error::{GpuResult, RenderError, RenderResult};
use crate::gpu::GpuInstance;
use crate::handle::PhysicalDeviceId;
use crate::types::{DeviceClass, QueueCapabilities};

/// Default preference, best first. Integrated parts win over discrete ones:
/// a compositor drawing one quad gains nothing from a big GPU.
pub const DEFAULT_PREFERENCE: [DeviceClass; 5] = [
    DeviceClass::IntegratedGpu,
    DeviceClass::DiscreteGpu,
    DeviceClass::VirtualGpu,
    DeviceClass::Other,
    DeviceClass::Cpu,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceScore {
    pub is_suitable: bool,
    pub best_queue_index: u32,
    pub device_class: DeviceClass,
}

/// Total order over device classes used to compare suitable devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceRanking {
    order: [DeviceClass; 5],
}

impl Default for DeviceRanking {
    fn default() -> Self {
        Self {
            order: DEFAULT_PREFERENCE,
        }
    }
}

impl DeviceRanking {
    /// Builds a ranking from a best-first preference list. Duplicates are
    /// ignored; classes that are not listed rank below every listed class,
    /// in their default relative order.
    pub fn from_preference(preference: &[DeviceClass]) -> Self {
        let mut order = Vec::with_capacity(DEFAULT_PREFERENCE.len());
        for &class in preference.iter().chain(DEFAULT_PREFERENCE.iter()) {
            if !order.contains(&class) {
                order.push(class);
            }
        }
        let mut ranking = Self::default();
        ranking.order.copy_from_slice(&order);
        ranking
    }

    /// Higher is better.
    pub fn rank(&self, class: DeviceClass) -> u32 {
        let pos = self
            .order
            .iter()
            .position(|&c| c == class)
            .unwrap_or(self.order.len());
        (self.order.len() - pos) as u32
    }

    fn key(&self, score: &DeviceScore) -> Option<u32> {
        score
            .is_suitable
            .then(|| self.rank(score.device_class))
    }

    /// Unsuitable scores are all equivalent and below every suitable one;
    /// suitable scores compare by class rank.
    pub fn compare(&self, a: &DeviceScore, b: &DeviceScore) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }
}

/// Scores one device. The first queue family that supports graphics and
/// can present wins; `can_present` is only asked about graphics families.
pub fn score_device(
    report: &DeviceReport,
    mut can_present: impl FnMut(u32) -> GpuResult<bool>,
) -> GpuResult<DeviceScore> {
    let mut best = None;
    for (index, family) in report.queue_families.iter().enumerate() {
        let index = index as u32;
        if family.capabilities.contains(QueueCapabilities::GRAPHICS) && can_present(index)? {
            best = Some(index);
            break;
        }
    }

    Ok(DeviceScore {
        is_suitable: best.is_some(),
        best_queue_index: best.unwrap_or(0),
        device_class: report.class,
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedDevice {
    pub id: PhysicalDeviceId,
    pub name: String,
    pub score: DeviceScore,
}

/// Picks the best scoring device. Ties go to the device enumerated first.
pub fn select_device<I: GpuInstance>(
    instance: &I,
    ranking: &DeviceRanking,
) -> RenderResult<SelectedDevice> {
    let mut best: Option<SelectedDevice> = None;

    for report in instance.enumerate_devices()? {
        let score = score_device(&report, |family| instance.supports_present(report.id, family))?;
        if !score.is_suitable {
            warn!("Skipping device `{}`: no graphics queue can present", report.name);
            continue;
        }
        debug!(
            "Device `{}` ({:?}) suitable on queue family {}",
            report.name, score.device_class, score.best_queue_index
        );

        let better = match &best {
            None => true,
            Some(current) => ranking.compare(&score, &current.score) == Ordering::Greater,
        };
        if better {
            best = Some(SelectedDevice {
                id: report.id,
                name: report.name,
                score,
            });
        }
    }

    let selected = best.ok_or(RenderError::NoSuitableDevice)?;
    info!(
        "Selected device `{}` ({:?}), queue family {}",
        selected.name, selected.score.device_class, selected.score.best_queue_index
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::QueueFamily;

    fn report(class: DeviceClass, families: &[QueueCapabilities]) -> DeviceReport {
        DeviceReport {
            id: PhysicalDeviceId(1),
            name: "test".into(),
            class,
            queue_families: families
                .iter()
                .map(|&capabilities| QueueFamily {
                    capabilities,
                    queue_count: 1,
                })
                .collect(),
        }
    }

    fn suitable(class: DeviceClass) -> DeviceScore {
        DeviceScore {
            is_suitable: true,
            best_queue_index: 0,
            device_class: class,
        }
    }

    fn unsuitable(class: DeviceClass) -> DeviceScore {
        DeviceScore {
            is_suitable: false,
            ..suitable(class)
        }
    }

    #[test]
    fn first_presenting_graphics_family_wins() {
        let r = report(
            DeviceClass::DiscreteGpu,
            &[
                QueueCapabilities::TRANSFER,
                QueueCapabilities::GRAPHICS,
                QueueCapabilities::GRAPHICS | QueueCapabilities::COMPUTE,
                QueueCapabilities::GRAPHICS,
            ],
        );
        // family 1 cannot present, 2 and 3 can
        let score = score_device(&r, |family| Ok(family >= 2)).unwrap();
        assert!(score.is_suitable);
        assert_eq!(score.best_queue_index, 2);
    }

    #[test]
    fn present_is_only_queried_for_graphics_families() {
        let r = report(
            DeviceClass::IntegratedGpu,
            &[QueueCapabilities::COMPUTE, QueueCapabilities::TRANSFER],
        );
        let mut asked = Vec::new();
        let score = score_device(&r, |family| {
            asked.push(family);
            Ok(true)
        })
        .unwrap();
        assert!(!score.is_suitable);
        assert!(asked.is_empty());
    }

    #[test]
    fn default_ranking_prefers_integrated() {
        let ranking = DeviceRanking::default();
        let ranks: Vec<u32> = DEFAULT_PREFERENCE.iter().map(|&c| ranking.rank(c)).collect();
        assert_eq!(ranks, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn unsuitable_is_below_any_suitable() {
        let ranking = DeviceRanking::default();
        for &a in &DEFAULT_PREFERENCE {
            for &b in &DEFAULT_PREFERENCE {
                assert_eq!(ranking.compare(&unsuitable(a), &suitable(b)), Ordering::Less);
                assert_eq!(ranking.compare(&suitable(b), &unsuitable(a)), Ordering::Greater);
                assert_eq!(ranking.compare(&unsuitable(a), &unsuitable(b)), Ordering::Equal);
            }
        }
    }

    #[test]
    fn ordering_is_strict_weak() {
        let ranking = DeviceRanking::default();
        let scores: Vec<DeviceScore> = DEFAULT_PREFERENCE
            .iter()
            .flat_map(|&c| [suitable(c), unsuitable(c)])
            .collect();
        for a in &scores {
            // irreflexive
            assert_ne!(ranking.compare(a, a), Ordering::Less);
            for b in &scores {
                // asymmetric
                assert_eq!(ranking.compare(a, b), ranking.compare(b, a).reverse());
                for c in &scores {
                    if ranking.compare(a, b) == Ordering::Less
                        && ranking.compare(b, c) == Ordering::Less
                    {
                        assert_eq!(ranking.compare(a, c), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn preference_overrides_and_fills_missing_classes() {
        let ranking = DeviceRanking::from_preference(&[
            DeviceClass::DiscreteGpu,
            DeviceClass::DiscreteGpu,
            DeviceClass::Cpu,
        ]);
        assert_eq!(ranking.rank(DeviceClass::DiscreteGpu), 5);
        assert_eq!(ranking.rank(DeviceClass::Cpu), 4);
        assert_eq!(ranking.rank(DeviceClass::IntegratedGpu), 3);
        assert_eq!(ranking.rank(DeviceClass::VirtualGpu), 2);
        assert_eq!(ranking.rank(DeviceClass::Other), 1);
    }
}
