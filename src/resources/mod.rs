use std::collections::HashMap;

use anyhow::Context;

use crate::{
    config::SimConfig,
    data_structures::instance::Instance,
    resources::{
        animation::{AnimationClip, CharacterModel, Joint, Keyframes, Skeleton, Track},
        texture::{load_binary, load_string},
    },
};

/**
 * This module contains all logic for loading height textures, models and clips from external
 * files. Loaders are plain futures; whoever drives them hands the result to the simulation,
 * which stores it as a [`loadable::Loadable`].
 */
pub mod animation;
pub mod loadable;
pub mod texture;

/// Load a TOML settings file. Missing keys keep their defaults.
pub async fn load_config(file_name: &str) -> anyhow::Result<SimConfig> {
    let source = load_string(file_name).await?;
    SimConfig::from_toml_str(&source).with_context(|| format!("in {file_name}"))
}

/// Load a binary glTF character: its joint hierarchy and any clips it embeds.
pub async fn load_model_gltf(file_name: &str) -> anyhow::Result<CharacterModel> {
    let (document, buffers) = load_gltf(file_name).await?;
    let skeleton = read_skeleton(&document);
    let clips = read_clips(&document, &buffers);
    log::info!(
        "loaded {file_name}: {} joints, {} embedded clips",
        skeleton.len(),
        clips.len()
    );
    Ok(CharacterModel { skeleton, clips })
}

/// Load the first animation of a glTF file.
pub async fn load_clip_gltf(file_name: &str) -> anyhow::Result<AnimationClip> {
    let (document, buffers) = load_gltf(file_name).await?;
    read_clips(&document, &buffers)
        .into_iter()
        .next()
        .with_context(|| format!("{file_name} contains no animation"))
}

async fn load_gltf(file_name: &str) -> anyhow::Result<(gltf::Document, Vec<Vec<u8>>)> {
    let data = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&data).with_context(|| format!("invalid glTF {file_name}"))?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                if let Some(blob) = gltf.blob.as_deref() {
                    buffer_data.push(blob.into());
                };
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(uri).await?;
                buffer_data.push(bin);
            }
        }
    }
    Ok((gltf.document, buffer_data))
}

/// Flatten the scene hierarchy into a skeleton where parents precede children.
pub fn read_skeleton(document: &gltf::Document) -> Skeleton {
    fn visit(node: gltf::Node, parent: Option<usize>, joints: &mut Vec<Joint>) {
        let (position, rotation, scale) = node.transform().decomposed();
        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node_{}", node.index()));
        let idx = joints.len();
        joints.push(Joint {
            name,
            parent,
            rest: Instance {
                position: position.into(),
                rotation: rotation.into(),
                scale: scale.into(),
            },
        });
        for child in node.children() {
            visit(child, Some(idx), joints);
        }
    }

    let mut joints = Vec::new();
    for scene in document.scenes() {
        for node in scene.nodes() {
            visit(node, None, &mut joints);
        }
    }
    Skeleton::new(joints)
}

pub fn read_clips(document: &gltf::Document, buffers: &[Vec<u8>]) -> Vec<AnimationClip> {
    let node_names: HashMap<usize, String> = document
        .nodes()
        .map(|node| {
            let name = node
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("node_{}", node.index()));
            (node.index(), name)
        })
        .collect();

    document
        .animations()
        .map(|animation| {
            let tracks = animation
                .channels()
                .filter_map(|channel| {
                    let reader =
                        channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
                    let timestamps: Vec<f32> = match reader.read_inputs() {
                        Some(inputs) => inputs.collect(),
                        None => {
                            log::warn!("no timestamps found in channel {}", channel.index());
                            return None;
                        }
                    };
                    // Cubic spline outputs store (in-tangent, value, out-tangent) per keyframe
                    let cubic = matches!(
                        channel.sampler().interpolation(),
                        gltf::animation::Interpolation::CubicSpline
                    );
                    let keyframes = match reader.read_outputs()? {
                        gltf::animation::util::ReadOutputs::Translations(translations) => {
                            Keyframes::Translation(values_only(translations.map(Into::into), cubic))
                        }
                        gltf::animation::util::ReadOutputs::Rotations(rotations) => {
                            Keyframes::Rotation(values_only(rotations.into_f32().map(Into::into), cubic))
                        }
                        gltf::animation::util::ReadOutputs::Scales(scales) => {
                            Keyframes::Scale(values_only(scales.map(Into::into), cubic))
                        }
                        gltf::animation::util::ReadOutputs::MorphTargetWeights(_) => Keyframes::Other,
                    };
                    let target = node_names
                        .get(&channel.target().node().index())
                        .cloned()
                        .unwrap_or_default();
                    Some(Track::new(target, timestamps, keyframes))
                })
                .collect();
            AnimationClip::new(animation.name().unwrap_or("Default"), tracks)
        })
        .collect()
}

fn values_only<T>(values: impl Iterator<Item = T>, cubic: bool) -> Vec<T> {
    if cubic {
        values.skip(1).step_by(3).collect()
    } else {
        values.collect()
    }
}
