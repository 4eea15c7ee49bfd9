use crate::hazard::HazardId;
use crate::physics::PlatformId;
use crate::pickup::PickupId;
use crate::session::LevelSession;
use crate::sprite::billboard::FrameSurface;

/// What a node draws, looked up in the session every frame
/// - nodes never own entity data, only the key to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    /// index into the camera's parallax layers
    Layer(usize),
    Ground,
    Platform(PlatformId),
    Pickup(PickupId),
    Hazard(HazardId),
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneNode {
    pub target: NodeRef,
    /// world z, smaller is further from the eye
    pub depth: f32,
}

/// Draw list for one session, farthest first
/// - entities never move in z, so the order is fixed once built
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

/// Ground sits just behind everything standing on z = 0
const GROUND_DEPTH: f32 = -0.5;

impl SceneGraph {
    pub fn build<S: FrameSurface>(session: &LevelSession<S>) -> Self {
        let mut nodes: Vec<SceneNode> = session
            .camera()
            .layers()
            .iter()
            .enumerate()
            .map(|(index, layer)| SceneNode {
                target: NodeRef::Layer(index),
                depth: layer.depth,
            })
            .collect();
        nodes.push(SceneNode {
            target: NodeRef::Ground,
            depth: GROUND_DEPTH,
        });
        nodes.extend(session.physics().platforms().map(|(id, _)| SceneNode {
            target: NodeRef::Platform(id),
            depth: 0.0,
        }));
        nodes.extend(session.pickups().iter().map(|(id, pickup)| SceneNode {
            target: NodeRef::Pickup(id),
            depth: pickup.spawn.z,
        }));
        nodes.extend(session.hazards().iter().map(|(id, hazard)| SceneNode {
            target: NodeRef::Hazard(id),
            depth: hazard.position.z,
        }));
        nodes.push(SceneNode {
            target: NodeRef::Player,
            depth: session.billboard().position().z,
        });

        // stable, so equal depths keep insertion order
        nodes.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        SceneGraph { nodes }
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Rect;
    use crate::level::LevelConfig;
    use crate::session::JourneyLeg;
    use anyhow::Result;

    struct Blank;

    impl FrameSurface for Blank {
        fn clear(&mut self) -> Result<()> {
            Ok(())
        }

        fn fill(&mut self, _rect: &Rect, _color: &str) -> Result<()> {
            Ok(())
        }

        fn blit(&mut self, _source: &Rect, _destination: &Rect, _mirrored: bool) -> Result<()> {
            Ok(())
        }
    }

    fn scene() -> (SceneGraph, LevelSession<Blank>) {
        let session =
            LevelSession::new(LevelConfig::default(), JourneyLeg::Outbound, Blank, || 0.0).unwrap();
        (SceneGraph::build(&session), session)
    }

    #[test]
    fn every_entity_gets_one_node() {
        let (scene, session) = scene();
        let expected = session.camera().layers().len()
            + 1
            + session.physics().platforms().count()
            + session.pickups().len()
            + session.hazards().iter().count()
            + 1;
        assert_eq!(scene.len(), expected);
    }

    #[test]
    fn far_layers_first_player_last() {
        let (scene, _) = scene();
        let nodes = scene.nodes();
        assert_eq!(nodes.first().map(|node| node.target), Some(NodeRef::Layer(0)));
        assert_eq!(nodes.get(1).map(|node| node.target), Some(NodeRef::Layer(1)));
        assert_eq!(nodes.last().map(|node| node.target), Some(NodeRef::Player));
        assert!(nodes.windows(2).all(|pair| pair[0].depth <= pair[1].depth));
    }

    #[test]
    fn every_node_resolves_in_the_session() {
        let (scene, session) = scene();
        for node in scene.nodes() {
            let found = match node.target {
                NodeRef::Layer(index) => session.camera().layers().get(index).is_some(),
                NodeRef::Ground | NodeRef::Player => true,
                NodeRef::Platform(id) => session.physics().platform(id).is_some(),
                NodeRef::Pickup(id) => session.pickups().get(id).is_some(),
                NodeRef::Hazard(id) => session.hazards().get(id).is_some(),
            };
            assert!(found, "{:?} points at nothing", node.target);
        }
    }
}
