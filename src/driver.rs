//! Frame driver.
//!
//! [`Game`] owns the whole simulation: scene graph, physics world, body registry, character,
//! controls and camera. The host feeds it input events and resolved assets and calls
//! [`Game::frame`] once per display frame, which runs one ordered pass:
//!
//! 1. sample input into a head orientation
//! 2. step physics and sync body transforms onto the scene
//! 3. advance animations
//! 4. update the character state (orientation, movement)
//! 5. resolve world transforms and submit the frame to the [`RenderSurface`]

use cgmath::{Matrix4, Quaternion, Vector3};
use futures::future::{FutureExt, LocalBoxFuture};
use log::{info, warn};
use winit::{
    event::{DeviceEvent, WindowEvent},
    keyboard::KeyCode,
};

use crate::{
    animation::{AnimationClip, Pose},
    character::Character,
    config::SimConfig,
    controls::{Controls, FirstPersonCamera},
    data_structures::{
        heightmap::HeightGrid,
        instance::Instance,
        scene_graph::{SceneGraph, VisualId, VisualKind},
    },
    physics::{BodyDesc, BodyHandle, PhysicsWorld, RigidBodyRegistry, Shape},
    resources::{
        self, animation::CharacterModel, loadable::Loadable, texture::load_heightmap,
    },
    terrain::{Terrain, TerrainSize},
};

/// Everything the renderer gets to see of one frame.
pub struct Frame<'a> {
    pub background: [f32; 3],
    pub view_proj: Matrix4<f32>,
    pub camera_rotation: Quaternion<f32>,
    /// World transform of every visual, in scene order.
    pub transforms: Vec<(VisualId, Instance)>,
    pub scene: &'a SceneGraph,
    /// The character's visual and blended pose, once it is loaded.
    pub pose: Option<(VisualId, Pose)>,
}

/// Whatever draws the simulation.
pub trait RenderSurface {
    /// Size in physical pixels.
    fn viewport(&self) -> (u32, u32);

    fn submit(&mut self, frame: Frame<'_>);
}

/// A surface that draws nothing and keeps the last submitted frame.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    viewport: (u32, u32),
    pub frames: usize,
    pub background: [f32; 3],
    pub transforms: Vec<(VisualId, Instance)>,
    pub pose: Option<(VisualId, Pose)>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: (width, height),
            ..Default::default()
        }
    }

    pub fn transform_of(&self, visual: VisualId) -> Option<&Instance> {
        self.transforms
            .iter()
            .find(|(id, _)| *id == visual)
            .map(|(_, instance)| instance)
    }
}

impl RenderSurface for HeadlessSurface {
    fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    fn submit(&mut self, frame: Frame<'_>) {
        self.frames += 1;
        self.background = frame.background;
        self.transforms = frame.transforms;
        self.pose = frame.pose;
    }
}

/// A finished asset request.
#[derive(Debug)]
pub enum AssetLoaded {
    Heightmap(anyhow::Result<HeightGrid>),
    CharacterModel(anyhow::Result<CharacterModel>),
    Animation {
        name: String,
        result: anyhow::Result<AnimationClip>,
    },
}

/// Terrain pieces that exist once the height texture has loaded. The surface mesh itself lives
/// in the scene graph under `visual`.
#[derive(Debug)]
pub struct TerrainHandles {
    pub visual: VisualId,
    pub body: BodyHandle,
    pub size: TerrainSize,
}

pub struct Game {
    config: SimConfig,
    scene: SceneGraph,
    physics: PhysicsWorld,
    registry: RigidBodyRegistry,
    terrain: Loadable<TerrainHandles>,
    ball: (VisualId, BodyHandle),
    character: Character,
    controls: Controls,
    camera: FirstPersonCamera,
}

impl Game {
    /**
     * Build the static part of the scene.
     *
     * The ball exists right away. Terrain and character are requested here and appear when
     * their assets are handed to [`Game::apply`].
     */
    pub fn new(config: SimConfig, viewport: (u32, u32)) -> Self {
        let mut scene = SceneGraph::new(config.camera.background);
        let mut physics = PhysicsWorld::new(&config.physics);
        let mut registry = RigidBodyRegistry::new();

        let ball_position = Vector3::from(config.ball.position);
        let ball_visual = scene.add(
            VisualKind::Sphere {
                radius: config.ball.radius,
            },
            Instance::from(ball_position),
        );
        let ball_body = physics.add_body(
            BodyDesc::new(
                Shape::Sphere {
                    radius: config.ball.radius,
                },
                config.ball.mass,
            )
            .at(ball_position)
            .with_friction(config.ball.friction)
            .with_rolling_friction(config.ball.rolling_friction),
        );
        registry.add_body(ball_visual, ball_body);

        let mut character = Character::new(&config.character);
        for (name, _) in &config.assets.animations {
            character.load_animation(name, *name == config.assets.default_animation);
        }

        let controls = Controls::new(&config.controls, (viewport.0 as f32, viewport.1 as f32));
        let camera = FirstPersonCamera::new(&config.camera, viewport.0, viewport.1);

        Self {
            config,
            scene,
            physics,
            registry,
            terrain: Loadable::Pending,
            ball: (ball_visual, ball_body),
            character,
            controls,
            camera,
        }
    }

    /// One future per asset the scene needs. Each resolves to the value for [`Game::apply`].
    pub fn asset_requests(&self) -> Vec<LocalBoxFuture<'static, AssetLoaded>> {
        let assets = &self.config.assets;
        let mut requests = Vec::new();

        let file = assets.heightmap.clone();
        requests.push(async move { AssetLoaded::Heightmap(load_heightmap(&file).await) }.boxed_local());

        let file = assets.character_model.clone();
        requests.push(
            async move { AssetLoaded::CharacterModel(resources::load_model_gltf(&file).await) }
                .boxed_local(),
        );

        for (name, file) in assets.animations.iter().cloned() {
            requests.push(
                async move {
                    let result = resources::load_clip_gltf(&file).await;
                    AssetLoaded::Animation { name, result }
                }
                .boxed_local(),
            );
        }
        requests
    }

    pub fn apply(&mut self, loaded: AssetLoaded) {
        match loaded {
            AssetLoaded::Heightmap(result) => self.resolve_terrain(result),
            AssetLoaded::CharacterModel(result) => {
                self.character.resolve_mesh(result, &mut self.scene)
            }
            AssetLoaded::Animation { name, result } => self.character.resolve_animation(&name, result),
        }
    }

    /// Generate the terrain surface and its static collision body.
    pub fn resolve_terrain(&mut self, result: anyhow::Result<HeightGrid>) {
        if !self.terrain.is_pending() {
            warn!("terrain already settled");
            return;
        }
        let terrain = result.map(|grid| {
            let Terrain { size, mesh, shape } = Terrain::generate(&grid, &self.config.terrain);
            let visual = self.scene.add(VisualKind::Terrain(mesh), Instance::new());
            let body = self
                .physics
                .add_body(BodyDesc::new(Shape::Heightfield(shape), 0.0));
            self.registry.add_body(visual, body);
            info!("terrain ready");
            TerrainHandles { visual, body, size }
        });
        if let Err(err) = &terrain {
            warn!("terrain failed to load: {err:#}");
        }
        self.terrain.resolve(terrain);
    }

    /// Feed a window event to the controls and apply the state change they ask for.
    pub fn on_window_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::Resized(size) = event {
            self.camera.projection.resize(size.width, size.height);
        }
        if let Some(next) = self.controls.on_window_event(event, self.character.state()) {
            self.character.set_state(next.name());
        }
    }

    pub fn key_down(&mut self, key: KeyCode) {
        if let Some(next) = self.controls.key_down(key, self.character.state()) {
            self.character.set_state(next.name());
        }
    }

    pub fn key_up(&mut self, key: KeyCode) {
        if let Some(next) = self.controls.key_up(key, self.character.state()) {
            self.character.set_state(next.name());
        }
    }

    pub fn on_device_event(&mut self, event: &DeviceEvent) {
        self.controls.on_device_event(event);
    }

    /// Pointer movement only turns the head while the pointer is locked to the window.
    pub fn set_pointer_locked(&mut self, locked: bool) {
        self.controls.set_pointer_locked(locked);
    }

    /// Run one frame of `delta` seconds and submit it to `surface`.
    pub fn frame(&mut self, delta: f32, surface: &mut dyn RenderSurface) {
        let (width, height) = surface.viewport();
        if (width as f32, height as f32) != self.controls.viewport() {
            self.controls.resize(width as f32, height as f32);
            self.camera.projection.resize(width, height);
        }

        let head = self.controls.update();
        self.character.set_head(head);
        self.camera.rotation = head;

        self.registry.step(
            &mut self.physics,
            &mut self.scene,
            delta,
            self.config.physics.max_sub_steps,
        );

        self.character.update_animation(delta);
        self.character.update(delta, &mut self.scene);

        self.scene.update_world_transforms();

        let pose = self
            .character
            .mesh()
            .map(|mesh| mesh.visual)
            .zip(self.character.pose());
        surface.submit(Frame {
            background: self.scene.background(),
            view_proj: self.camera.view_proj(),
            camera_rotation: self.camera.rotation,
            transforms: self.scene.world_transforms(),
            scene: &self.scene,
            pose,
        });
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn registry(&self) -> &RigidBodyRegistry {
        &self.registry
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn character_mut(&mut self) -> &mut Character {
        &mut self.character
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut Controls {
        &mut self.controls
    }

    pub fn camera(&self) -> &FirstPersonCamera {
        &self.camera
    }

    pub fn ball(&self) -> (VisualId, BodyHandle) {
        self.ball
    }

    pub fn terrain(&self) -> &Loadable<TerrainHandles> {
        &self.terrain
    }
}
