use crate::ReadAt;

impl ReadAt for [u8] {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
        let end = usize::try_from(pos)
            .ok()
            .and_then(|start| start.checked_add(buf.len()));
        let Some(end) = end.filter(|&end| end <= self.len()) else {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        };
        buf.copy_from_slice(&self[end - buf.len()..end]);
        Ok(())
    }
}

impl ReadAt for Vec<u8> {
    fn size(&self) -> std::io::Result<u64> {
        self.as_slice().size()
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
        self.as_slice().read_at(pos, buf)
    }
}
