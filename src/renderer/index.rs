use bytemuck::cast_slice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    U16,
    U32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

/// Index list of a mesh part, stored in the narrowest format that holds its
/// largest index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBuffer {
    data: IndexData,
}

impl IndexBuffer {
    pub fn new(indices: &[u32]) -> Self {
        let fits_u16 = indices.iter().all(|index| *index <= u16::MAX as u32);
        let data = if fits_u16 {
            IndexData::U16(indices.iter().map(|index| *index as u16).collect())
        } else {
            IndexData::U32(indices.to_vec())
        };
        Self { data }
    }

    pub fn format(&self) -> IndexFormat {
        match self.data {
            IndexData::U16(_) => IndexFormat::U16,
            IndexData::U32(_) => IndexFormat::U32,
        }
    }

    pub fn indices(&self) -> usize {
        match &self.data {
            IndexData::U16(indices) => indices.len(),
            IndexData::U32(indices) => indices.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            IndexData::U16(indices) => cast_slice(indices),
            IndexData::U32(indices) => cast_slice(indices),
        }
    }
}
