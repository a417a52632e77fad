//! Deferred property re-application for pasted media.
//!
//! Media elements finish loading asynchronously and reset their transform
//! when they do. Pasted media therefore get their properties applied again
//! on the next animation frame and after a few fixed delays.

use crate::scene::{Node, NodeId, SceneHost, Transform, VisualProps};

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// The properties a paste guarantees on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeProps {
    pub name: Option<String>,
    pub transform: Transform,
    pub visual: VisualProps,
    pub z_index: i32,
    pub locked: bool,
    pub visible: bool,
}

impl NodeProps {
    pub fn capture(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            transform: node.transform,
            visual: node.visual.clone(),
            z_index: node.z_index,
            locked: node.locked,
            visible: node.visible,
        }
    }

    pub fn apply(&self, node: &mut Node) {
        node.name = self.name.clone();
        node.transform = self.transform;
        node.visual = self.visual.clone();
        node.z_index = self.z_index;
        node.locked = self.locked;
        node.visible = self.visible;
    }
}

#[derive(Debug, Clone)]
struct ReapplyJob {
    id: NodeId,
    props: NodeProps,
    awaiting_frame: bool,
    deadlines: Vec<Instant>,
}

/// Pending re-application passes.
#[derive(Debug, Clone)]
pub struct ReapplyQueue {
    delays: Vec<Duration>,
    jobs: Vec<ReapplyJob>,
}

impl ReapplyQueue {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self {
            delays,
            jobs: Vec::new(),
        }
    }

    pub fn from_millis(delays_ms: &[u64]) -> Self {
        Self::new(delays_ms.iter().map(|&ms| Duration::from_millis(ms)).collect())
    }

    pub fn is_idle(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.jobs.len()
    }

    /// Queue `props` to be applied to `id` on the next frame and after each delay.
    pub fn schedule(&mut self, id: NodeId, props: NodeProps, now: Instant) {
        self.jobs.retain(|job| job.id != id);
        self.jobs.push(ReapplyJob {
            id,
            props,
            awaiting_frame: true,
            deadlines: self.delays.iter().map(|&d| now + d).collect(),
        });
    }

    /// Run the next-frame pass. Returns the number of nodes updated.
    pub fn on_animation_frame<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let mut applied = 0;
        for job in self.jobs.iter_mut().filter(|job| job.awaiting_frame) {
            job.awaiting_frame = false;
            if reapply(host, job) {
                applied += 1;
            }
        }
        self.retire(host);
        applied
    }

    /// Run every pass whose delay has elapsed. Returns the number of nodes updated.
    pub fn poll<H: SceneHost + ?Sized>(&mut self, host: &mut H, now: Instant) -> usize {
        let mut applied = 0;
        for job in &mut self.jobs {
            let due = job.deadlines.iter().filter(|&&d| d <= now).count();
            if due == 0 {
                continue;
            }
            job.deadlines.retain(|&d| d > now);
            if reapply(host, job) {
                applied += 1;
            }
        }
        self.retire(host);
        applied
    }

    /// Drop finished jobs and jobs whose node is gone.
    fn retire<H: SceneHost + ?Sized>(&mut self, host: &H) {
        self.jobs.retain(|job| {
            host.contains(job.id) && (job.awaiting_frame || !job.deadlines.is_empty())
        });
    }
}

fn reapply<H: SceneHost + ?Sized>(host: &mut H, job: &ReapplyJob) -> bool {
    let Some(node) = host.get_mut(job.id) else {
        log::debug!("Pasted media {} is gone, dropping reapply", job.id);
        return false;
    };
    job.props.apply(node);
    host.mark_updated(job.id);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MediaHost, Scene};

    #[test]
    fn test_reapply_survives_load_reset() {
        let mut scene = Scene::new();
        let id = scene
            .add_audio_element("https://cdn.test/a.mp3", "A", 0.0, 0.0)
            .unwrap();
        let node = scene.get_mut(id).unwrap();
        node.transform.scale_x = 0.5;
        node.transform.x = 40.0;
        let props = NodeProps::capture(scene.get(id).unwrap());

        let start = Instant::now();
        let mut queue = ReapplyQueue::from_millis(&[50, 250]);
        queue.schedule(id, props, start);

        // Load completes after the frame pass, wiping the scale.
        assert_eq!(queue.on_animation_frame(&mut scene), 1);
        scene.resolve_media_loads();
        assert_eq!(scene.get(id).unwrap().transform.scale_x, 1.0);

        assert_eq!(queue.poll(&mut scene, start + Duration::from_millis(10)), 0);
        assert_eq!(queue.poll(&mut scene, start + Duration::from_millis(60)), 1);
        assert_eq!(scene.get(id).unwrap().transform.scale_x, 0.5);
        assert!(!queue.is_idle());
        assert_eq!(queue.poll(&mut scene, start + Duration::from_millis(300)), 1);
        assert!(queue.is_idle());
    }

    #[test]
    fn test_removed_node_dropped() {
        let mut scene = Scene::new();
        let id = scene
            .add_video_element("https://cdn.test/v.mp4", "V", 0.0, 0.0, None)
            .unwrap();
        let mut queue = ReapplyQueue::from_millis(&[50]);
        queue.schedule(id, NodeProps::capture(scene.get(id).unwrap()), Instant::now());
        scene.remove(id);
        assert_eq!(queue.on_animation_frame(&mut scene), 0);
        assert!(queue.is_idle());
    }
}
