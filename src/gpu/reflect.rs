//! WGSL compilation and introspection with `naga`.
//!
//! Both backends compile shader stages through [`compile`] and link them with
//! [`link`], so a shader that fails here fails the same way headless and on a
//! real adapter. Introspection yields what a GL program would report after
//! linking: vertex input names with their `@location`, and named resource
//! globals with their `(group, binding)` slot.

use naga::{
    AddressSpace, Binding, TypeInner,
    valid::{Capabilities, ValidationFlags, Validator},
};

use crate::gpu::{ShaderStage, UniformLocation};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Buffer,
    Texture,
    Sampler,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingInfo {
    pub name: String,
    pub location: UniformLocation,
    pub kind: BindingKind,
}

/// A validated shader stage.
#[derive(Clone, Debug)]
pub struct StageReflection {
    pub stage: ShaderStage,
    pub source: String,
    pub entry_point: String,
    pub attributes: Vec<(String, u32)>,
    pub bindings: Vec<BindingInfo>,
}

/// Two stages linked into one program.
#[derive(Clone, Debug)]
pub struct ProgramReflection {
    pub vertex: StageReflection,
    pub fragment: StageReflection,
    pub bindings: Vec<BindingInfo>,
}

impl ProgramReflection {
    pub fn attributes(&self) -> &[(String, u32)] {
        &self.vertex.attributes
    }

    pub fn groups(&self) -> Vec<u32> {
        let mut groups: Vec<u32> = self.bindings.iter().map(|b| b.location.group).collect();
        groups.sort_unstable();
        groups.dedup();
        groups
    }

    /// The texture binding a sampler belongs to, paired by the `<texture>_sampler` name.
    pub fn texture_for_sampler(&self, sampler: &BindingInfo) -> Option<&BindingInfo> {
        let texture_name = sampler.name.strip_suffix("_sampler")?;
        self.bindings
            .iter()
            .find(|b| b.kind == BindingKind::Texture && b.name == texture_name)
    }
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

/// Parses and validates `source`, returning the info log on failure.
pub fn compile(stage: ShaderStage, source: &str) -> Result<StageReflection, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| e.into_inner().to_string())?;

    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga_stage(stage))
        .ok_or_else(|| format!("no {stage:?} entry point"))?;

    let mut attributes = Vec::new();
    if stage == ShaderStage::Vertex {
        for argument in entry.function.arguments.iter() {
            match (&argument.binding, &module.types[argument.ty].inner) {
                (Some(Binding::Location { location, .. }), _) => {
                    attributes.push((argument.name.clone().unwrap_or_default(), *location))
                }
                (None, TypeInner::Struct { members, .. }) => {
                    for member in members {
                        if let Some(Binding::Location { location, .. }) = member.binding {
                            attributes.push((member.name.clone().unwrap_or_default(), location));
                        }
                    }
                }
                _ => (),
            }
        }
    }

    let bindings = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| {
            let binding = var.binding.as_ref()?;
            let kind = match (&module.types[var.ty].inner, var.space) {
                (TypeInner::Image { .. }, _) => BindingKind::Texture,
                (TypeInner::Sampler { .. }, _) => BindingKind::Sampler,
                (_, AddressSpace::Uniform) => BindingKind::Buffer,
                _ => return None,
            };
            Some(BindingInfo {
                name: var.name.clone()?,
                location: UniformLocation {
                    group: binding.group,
                    binding: binding.binding,
                },
                kind,
            })
        })
        .collect();

    Ok(StageReflection {
        stage,
        source: source.to_string(),
        entry_point: entry.name.clone(),
        attributes,
        bindings,
    })
}

/// Merges the resource bindings of both stages, rejecting slots that disagree.
pub fn link(
    vertex: &StageReflection,
    fragment: &StageReflection,
) -> Result<ProgramReflection, String> {
    if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
        return Err("a program needs one vertex and one fragment stage".to_string());
    }
    let mut bindings: Vec<BindingInfo> = vertex.bindings.clone();
    for binding in fragment.bindings.iter() {
        match bindings.iter().find(|b| b.location == binding.location) {
            Some(existing) if existing.name != binding.name || existing.kind != binding.kind => {
                return Err(format!(
                    "slot {:?} is {} in the vertex stage but {} in the fragment stage",
                    binding.location, existing.name, binding.name
                ));
            }
            Some(_) => (),
            None => bindings.push(binding.clone()),
        }
    }
    bindings.sort_by_key(|b| b.location);

    Ok(ProgramReflection {
        vertex: vertex.clone(),
        fragment: fragment.clone(),
        bindings,
    })
}
