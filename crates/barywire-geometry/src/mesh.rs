use std::collections::BTreeMap;

use barywire_base::{Result, invalid_geometry};
use cgmath::Point3;

pub const POSITION: &str = "position";
pub const NORMAL: &str = "normal";
pub const UV: &str = "uv";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    F32,
    U32,
    I32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeData {
    F32(Vec<f32>),
    U32(Vec<u32>),
    I32(Vec<i32>),
}

impl AttributeData {
    pub fn len(&self) -> usize {
        match self {
            AttributeData::F32(values) => values.len(),
            AttributeData::U32(values) => values.len(),
            AttributeData::I32(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            AttributeData::F32(_) => ElementType::F32,
            AttributeData::U32(_) => ElementType::U32,
            AttributeData::I32(_) => ElementType::I32,
        }
    }

    /// Copies `item_size` values per index into a new buffer of the same type.
    /// Indices must already be validated against the vertex count.
    fn gather(&self, item_size: usize, indices: &[u32]) -> Self {
        match self {
            AttributeData::F32(values) => AttributeData::F32(gather(values, item_size, indices)),
            AttributeData::U32(values) => AttributeData::U32(gather(values, item_size, indices)),
            AttributeData::I32(values) => AttributeData::I32(gather(values, item_size, indices)),
        }
    }
}

fn gather<T: Copy>(values: &[T], item_size: usize, indices: &[u32]) -> Vec<T> {
    let mut out = Vec::with_capacity(indices.len() * item_size);
    for &index in indices {
        let start = index as usize * item_size;
        out.extend_from_slice(&values[start..start + item_size]);
    }
    out
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexAttribute {
    item_size: usize,
    data: AttributeData,
}

impl VertexAttribute {
    pub fn new(item_size: usize, data: AttributeData) -> Result<Self> {
        if item_size == 0 {
            return Err(invalid_geometry("attribute item size must be > 0"));
        }
        if data.len() % item_size != 0 {
            return Err(invalid_geometry(format!(
                "attribute length {} is not a multiple of item size {item_size}",
                data.len()
            )));
        }
        Ok(Self { item_size, data })
    }

    pub fn f32(item_size: usize, values: Vec<f32>) -> Result<Self> {
        Self::new(item_size, AttributeData::F32(values))
    }

    pub fn u32(item_size: usize, values: Vec<u32>) -> Result<Self> {
        Self::new(item_size, AttributeData::U32(values))
    }

    pub fn i32(item_size: usize, values: Vec<i32>) -> Result<Self> {
        Self::new(item_size, AttributeData::I32(values))
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.item_size
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            AttributeData::F32(values) => Some(values),
            _ => None,
        }
    }

    pub(crate) fn gather(&self, indices: &[u32]) -> Self {
        Self {
            item_size: self.item_size,
            data: self.data.gather(self.item_size, indices),
        }
    }
}

pub type AttributeMap = BTreeMap<String, VertexAttribute>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    attributes: AttributeMap,
    indices: Option<Vec<u32>>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: VertexAttribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn insert_attribute(
        &mut self,
        name: impl Into<String>,
        attribute: VertexAttribute,
    ) -> Option<VertexAttribute> {
        self.attributes.insert(name.into(), attribute)
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<VertexAttribute> {
        self.attributes.remove(name)
    }

    pub fn set_indices(&mut self, indices: Option<Vec<u32>>) {
        self.indices = indices;
    }

    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &VertexAttribute)> {
        self.attributes.iter().map(|(name, attr)| (name.as_str(), attr))
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// Smallest vertex count across all attributes; 0 without attributes.
    pub fn vertex_count(&self) -> usize {
        min_vertex_count(&self.attributes)
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match &self.indices {
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    return Err(invalid_geometry(format!(
                        "index count {} is not a multiple of 3",
                        indices.len()
                    )));
                }
                check_indices(&self.attributes, indices)
            }
            None => {
                let count = common_vertex_count(&self.attributes)?;
                if count % 3 != 0 {
                    return Err(invalid_geometry(format!(
                        "unindexed vertex count {count} is not a multiple of 3"
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        position_bounds(self.attribute(POSITION)?)
    }

    pub(crate) fn attribute_map(&self) -> &AttributeMap {
        &self.attributes
    }
}

/// A mesh without an index array: every three consecutive vertices form one
/// triangle with its own copy of the attribute values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnindexedMesh {
    attributes: AttributeMap,
}

impl UnindexedMesh {
    pub(crate) fn from_attributes(attributes: AttributeMap) -> Self {
        Self { attributes }
    }

    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &VertexAttribute)> {
        self.attributes.iter().map(|(name, attr)| (name.as_str(), attr))
    }

    pub fn vertex_count(&self) -> usize {
        min_vertex_count(&self.attributes)
    }

    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }

    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        position_bounds(self.attribute(POSITION)?)
    }

    pub fn into_mesh(self) -> Mesh {
        Mesh {
            attributes: self.attributes,
            indices: None,
        }
    }

    pub(crate) fn attribute_map(&self) -> &AttributeMap {
        &self.attributes
    }

    pub(crate) fn insert_attribute(&mut self, name: &str, attribute: VertexAttribute) {
        self.attributes.insert(name.to_string(), attribute);
    }
}

impl From<UnindexedMesh> for Mesh {
    fn from(value: UnindexedMesh) -> Self {
        value.into_mesh()
    }
}

fn min_vertex_count(attributes: &AttributeMap) -> usize {
    attributes
        .values()
        .map(VertexAttribute::vertex_count)
        .min()
        .unwrap_or(0)
}

/// Vertex count shared by every attribute, or an error naming the first
/// attribute that disagrees.
pub(crate) fn common_vertex_count(attributes: &AttributeMap) -> Result<usize> {
    let mut iter = attributes.iter();
    let Some((_, first)) = iter.next() else {
        return Ok(0);
    };
    let expected = first.vertex_count();
    for (name, attr) in iter {
        if attr.vertex_count() != expected {
            return Err(invalid_geometry(format!(
                "attribute `{name}` has {} vertices, expected {expected}",
                attr.vertex_count()
            )));
        }
    }
    Ok(expected)
}

pub(crate) fn check_indices(attributes: &AttributeMap, indices: &[u32]) -> Result<()> {
    let Some((position, &max)) = indices
        .iter()
        .enumerate()
        .max_by_key(|(_, index)| **index)
    else {
        return Ok(());
    };
    for (name, attr) in attributes {
        let count = attr.vertex_count();
        if max as usize >= count {
            return Err(invalid_geometry(format!(
                "index {max} at position {position} is out of bounds for attribute `{name}` with {count} vertices"
            )));
        }
    }
    Ok(())
}

fn position_bounds(attribute: &VertexAttribute) -> Option<(Point3<f32>, Point3<f32>)> {
    if attribute.item_size() < 3 {
        return None;
    }
    let values = attribute.as_f32()?;
    let mut points = values
        .chunks_exact(attribute.item_size())
        .map(|item| Point3::new(item[0], item[1], item[2]));
    let first = points.next()?;
    let mut min = first;
    let mut max = first;
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        min.z = min.z.min(p.z);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
        max.z = max.z.max(p.z);
    }
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_item_size() {
        assert!(VertexAttribute::f32(0, vec![]).is_err());
    }

    #[test]
    fn rejects_ragged_attribute() {
        assert!(VertexAttribute::f32(3, vec![0.0; 4]).is_err());
    }

    #[test]
    fn validate_flags_out_of_range_index() -> Result<()> {
        let mesh = Mesh::new()
            .with_attribute(POSITION, VertexAttribute::f32(3, vec![0.0; 9])?)
            .with_indices(vec![0, 1, 3]);
        assert!(mesh.validate().is_err());
        Ok(())
    }

    #[test]
    fn validate_flags_unaligned_unindexed_mesh() -> Result<()> {
        let mesh = Mesh::new().with_attribute(POSITION, VertexAttribute::f32(3, vec![0.0; 12])?);
        assert!(mesh.validate().is_err());
        Ok(())
    }

    #[test]
    fn bounds_cover_positions() -> Result<()> {
        let mesh = Mesh::new().with_attribute(
            POSITION,
            VertexAttribute::f32(3, vec![-1.0, 0.0, 2.0, 3.0, -4.0, 0.5, 0.0, 1.0, 0.0])?,
        );
        let (min, max) = mesh.bounds().expect("bounds");
        assert_eq!(min, Point3::new(-1.0, -4.0, 0.0));
        assert_eq!(max, Point3::new(3.0, 1.0, 2.0));
        Ok(())
    }
}
