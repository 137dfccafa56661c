use cgmath::{Quaternion, Rad, Rotation3, Vector3};
use terrain_walker::{
    animation::{AnimationClip, Joint, Keyframes, Skeleton, Track},
    character::Character,
    config::{CharacterConfig, PhysicsConfig},
    data_structures::{heightmap::HeightGrid, instance::Instance, scene_graph::SceneGraph},
    physics::PhysicsWorld,
    resources::animation::CharacterModel,
};

/// A grid whose samples alternate between 1 and -1 like a checkerboard.
pub fn alternating_grid(rows: usize, cols: usize) -> HeightGrid {
    let heights = (0..rows * cols)
        .map(|i| if (i / cols + i % cols) % 2 == 0 { 1.0 } else { -1.0 })
        .collect();
    HeightGrid::new(rows, cols, heights).unwrap()
}

/// Two-joint skeleton: `root` with a child `spine` one unit above it.
pub fn skeleton() -> Skeleton {
    Skeleton::new(vec![
        Joint {
            name: "root".to_string(),
            parent: None,
            rest: Instance::new(),
        },
        Joint {
            name: "spine".to_string(),
            parent: Some(0),
            rest: Instance::from(Vector3::new(0.0, 1.0, 0.0)),
        },
    ])
}

/// A clip lasting `duration` seconds that moves `root` from x = 0 to x = `distance`.
pub fn sliding_clip(name: &str, duration: f32, distance: f32) -> AnimationClip {
    AnimationClip::new(
        name,
        vec![Track::new(
            "root",
            vec![0.0, duration],
            Keyframes::Translation(vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(distance, 0.0, 0.0),
            ]),
        )],
    )
}

pub fn model() -> CharacterModel {
    CharacterModel {
        skeleton: skeleton(),
        clips: Vec::new(),
    }
}

pub fn yaw(degrees: f32) -> Quaternion<f32> {
    Quaternion::from_angle_y(Rad(degrees.to_radians()))
}

/// Everything a character needs around it.
pub struct Stage {
    pub scene: SceneGraph,
    pub physics: PhysicsWorld,
    pub character: Character,
}

impl Stage {
    /// A character with mesh and idle (2 s), walk (1 s) and run (0.5 s) clips loaded.
    pub fn ready() -> Self {
        let mut stage = Self::pending();
        stage.resolve_mesh();
        stage
            .character
            .resolve_animation("idle", Ok(sliding_clip("idle clip", 2.0, 0.0)));
        stage
            .character
            .resolve_animation("walk", Ok(sliding_clip("walk clip", 1.0, 1.0)));
        stage
            .character
            .resolve_animation("run", Ok(sliding_clip("run clip", 0.5, 2.0)));
        stage
    }

    /// A character that requested idle (default), walk and run but has nothing loaded yet.
    pub fn pending() -> Self {
        let mut character = Character::new(&CharacterConfig::default());
        character.load_animation("idle", true);
        character.load_animation("walk", false);
        character.load_animation("run", false);
        Self {
            scene: SceneGraph::default(),
            physics: PhysicsWorld::new(&PhysicsConfig::default()),
            character,
        }
    }

    pub fn resolve_mesh(&mut self) {
        self.character
            .resolve_mesh(Ok(model()), &mut self.scene);
    }

    pub fn update(&mut self, delta: f32) {
        self.character.update_animation(delta);
        self.character.update(delta, &mut self.scene);
    }

    pub fn action_time(&self, name: &str) -> f32 {
        let id = self.character.action(name).unwrap();
        self.character.mixer().action(id).unwrap().time()
    }
}
