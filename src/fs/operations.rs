use std::io::SeekFrom;

use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Positions `file` at the start of its last line and returns that offset. A trailing `\n` is
/// treated as the terminator of the last line rather than the start of an empty one. The file is
/// scanned from the end in chunks of `chunk_size` bytes.
pub async fn seek_to_last_line(
    file: &mut (impl AsyncSeek + AsyncRead + Unpin),
    chunk_size: usize,
) -> Result<u64, io::Error> {
    let end = file.seek(SeekFrom::End(0)).await?;
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut chunk_end = end;

    while chunk_end > 0 {
        let chunk_start = chunk_end.saturating_sub(buffer.len() as u64);
        let len = (chunk_end - chunk_start) as usize;
        file.seek(SeekFrom::Start(chunk_start)).await?;
        file.read_exact(&mut buffer[..len]).await?;

        for (offset, byte) in buffer[..len].iter().enumerate().rev() {
            let position = chunk_start + offset as u64;
            if *byte == b'\n' && position + 1 != end {
                return file.seek(SeekFrom::Start(position + 1)).await;
            }
        }
        chunk_end = chunk_start;
    }

    file.seek(SeekFrom::Start(0)).await
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use tempfile::tempfile;
    use tokio::io::AsyncReadExt;

    use super::seek_to_last_line;

    async fn file_with(content: &str) -> Result<tokio::fs::File> {
        let mut file = tempfile()?;
        file.write_all(content.as_bytes())?;
        Ok(tokio::fs::File::from_std(file))
    }

    #[tokio::test]
    async fn finds_unterminated_last_line() -> Result<()> {
        let mut file = file_with("first line\nsecond line\nthird").await?;
        let position = seek_to_last_line(&mut file, 1024).await?;
        assert_eq!(position, 23);
        let mut rest = String::new();
        file.read_to_string(&mut rest).await?;
        assert_eq!(rest, "third");
        Ok(())
    }

    #[tokio::test]
    async fn trailing_newline_belongs_to_last_line() -> Result<()> {
        let mut file = file_with("{\"hour\":1}\n{\"hour\":2}\n").await?;
        let position = seek_to_last_line(&mut file, 4).await?;
        assert_eq!(position, 11);
        let mut rest = String::new();
        file.read_to_string(&mut rest).await?;
        assert_eq!(rest, "{\"hour\":2}\n");
        Ok(())
    }

    #[tokio::test]
    async fn single_line_and_empty_files_start_at_zero() -> Result<()> {
        let mut file = file_with("only line\n").await?;
        assert_eq!(seek_to_last_line(&mut file, 3).await?, 0);

        let mut file = file_with("").await?;
        assert_eq!(seek_to_last_line(&mut file, 1024).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn chunk_boundaries_do_not_matter() -> Result<()> {
        let content = "aaaa\nbbbb\ncccc\n";
        for chunk in 1..8 {
            let mut file = file_with(content).await?;
            assert_eq!(seek_to_last_line(&mut file, chunk).await?, 10, "chunk {chunk}");
        }
        Ok(())
    }
}
