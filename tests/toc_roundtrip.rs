//! End-to-end TOC emission tests.
//!
//! Builds TOCs the way a linker-side caller would, serializes them with `put`, and
//! decodes the images field by field to verify the emitted bytes match the model.

use machoscope::file::io::{read_be_at, read_le_at, read_name_at};
use machoscope::prelude::*;

/// Builds the reference TOC of the tests: a 64-bit little-endian executable with one
/// `__TEXT` segment holding two sections, followed by a UUID command.
fn build_reference_toc() -> FileToc {
    let mut toc = FileToc::new(Magic::MAGIC_64, ByteOrder::LittleEndian);
    toc.header.cpu_type = machoscope::toc::header::CPU_TYPE_ARM64;
    toc.header.file_type = FileType::Execute;
    toc.header.flags = HeaderFlags::NOUNDEFS | HeaderFlags::DYLDLINK | HeaderFlags::PIE;

    let mut text = Segment::new("__TEXT", Magic::MAGIC_64).unwrap();
    text.vmaddr = 0x1_0000_0000;
    text.vmsize = 0x4000;
    text.fileoff = 0;
    text.filesz = 0x4000;
    text.maxprot = VmProt::READ | VmProt::EXECUTE;
    text.initprot = VmProt::READ | VmProt::EXECUTE;
    toc.add_segment(text);

    let mut sec_text = Section::new("__text", "__TEXT");
    sec_text.addr = 0x1_0000_1000;
    sec_text.size = 0x2000;
    sec_text.offset = 0x1000;
    sec_text.align = 4;
    toc.add_section(sec_text).unwrap();

    let mut sec_const = Section::new("__const", "__TEXT");
    sec_const.addr = 0x1_0000_3000;
    sec_const.size = 0x800;
    sec_const.offset = 0x3000;
    sec_const.align = 3;
    toc.add_section(sec_const).unwrap();

    toc.add_load(LoadCommand::new(LoadCmd::UUID, vec![0x5a; 16]));
    toc
}

#[test]
fn put_roundtrips_through_manual_decode() {
    let toc = build_reference_toc();
    let size = toc.toc_size().unwrap() as usize;

    let mut image = vec![0u8; size];
    let written = toc.put(&mut image).unwrap();
    assert_eq!(written, size);

    // Header
    let mut offset = 0;
    assert_eq!(read_le_at::<u32>(&image, &mut offset).unwrap(), 0xfeed_facf);
    let _cpu_type: u32 = read_le_at(&image, &mut offset).unwrap();
    let _cpu_subtype: u32 = read_le_at(&image, &mut offset).unwrap();
    assert_eq!(read_le_at::<u32>(&image, &mut offset).unwrap(), 2); // EXECUTE
    assert_eq!(read_le_at::<u32>(&image, &mut offset).unwrap(), 2); // ncmds
    assert_eq!(
        read_le_at::<u32>(&image, &mut offset).unwrap(),
        toc.load_size()
    );
    let _flags: u32 = read_le_at(&image, &mut offset).unwrap();
    let _reserved: u32 = read_le_at(&image, &mut offset).unwrap();
    assert_eq!(offset as u32, toc.hdr_size().unwrap());

    // Segment command
    assert_eq!(read_le_at::<u32>(&image, &mut offset).unwrap(), 0x19);
    let seg_cmdsize: u32 = read_le_at(&image, &mut offset).unwrap();
    assert_eq!(
        seg_cmdsize,
        Segment::COMMAND_SIZE_64 + 2 * Section::HEADER_SIZE_64
    );
    assert_eq!(read_name_at(&image, &mut offset).unwrap(), "__TEXT");
    assert_eq!(
        read_le_at::<u64>(&image, &mut offset).unwrap(),
        0x1_0000_0000
    );
    assert_eq!(read_le_at::<u64>(&image, &mut offset).unwrap(), 0x4000);
    assert_eq!(read_le_at::<u64>(&image, &mut offset).unwrap(), 0);
    assert_eq!(read_le_at::<u64>(&image, &mut offset).unwrap(), 0x4000);
    let _maxprot: u32 = read_le_at(&image, &mut offset).unwrap();
    let _initprot: u32 = read_le_at(&image, &mut offset).unwrap();
    assert_eq!(read_le_at::<u32>(&image, &mut offset).unwrap(), 2); // nsects
    let _seg_flags: u32 = read_le_at(&image, &mut offset).unwrap();

    // First section header
    assert_eq!(read_name_at(&image, &mut offset).unwrap(), "__text");
    assert_eq!(read_name_at(&image, &mut offset).unwrap(), "__TEXT");
    assert_eq!(
        read_le_at::<u64>(&image, &mut offset).unwrap(),
        0x1_0000_1000
    );
    assert_eq!(read_le_at::<u64>(&image, &mut offset).unwrap(), 0x2000);
    assert_eq!(read_le_at::<u32>(&image, &mut offset).unwrap(), 0x1000);

    // Skip to the second section header and check its names
    offset = toc.hdr_size().unwrap() as usize
        + Segment::COMMAND_SIZE_64 as usize
        + Section::HEADER_SIZE_64 as usize;
    assert_eq!(read_name_at(&image, &mut offset).unwrap(), "__const");
    assert_eq!(read_name_at(&image, &mut offset).unwrap(), "__TEXT");

    // UUID command follows the segment
    offset = toc.hdr_size().unwrap() as usize + seg_cmdsize as usize;
    assert_eq!(read_le_at::<u32>(&image, &mut offset).unwrap(), 0x1b);
    assert_eq!(read_le_at::<u32>(&image, &mut offset).unwrap(), 24);
    assert!(image[offset..offset + 16].iter().all(|&b| b == 0x5a));
}

#[test]
fn put_32bit_image_uses_narrow_layout() {
    let mut toc = FileToc::new(Magic::MAGIC_32, ByteOrder::LittleEndian);
    toc.header.file_type = FileType::Object;

    let mut text = Segment::new("__TEXT", Magic::MAGIC_32).unwrap();
    text.vmaddr = 0x1000;
    text.vmsize = 0x2000;
    toc.add_segment(text);
    toc.add_section(Section::new("__text", "__TEXT")).unwrap();

    let size = toc.toc_size().unwrap() as usize;
    assert_eq!(
        size as u32,
        FileHeader::SIZE_32 + Segment::COMMAND_SIZE_32 + Section::HEADER_SIZE_32
    );

    let mut image = vec![0u8; size];
    assert_eq!(toc.put(&mut image).unwrap(), size);

    let mut offset = 0;
    assert_eq!(read_le_at::<u32>(&image, &mut offset).unwrap(), 0xfeed_face);

    // Segment command begins right after the 28-byte header
    offset = FileHeader::SIZE_32 as usize;
    assert_eq!(read_le_at::<u32>(&image, &mut offset).unwrap(), 0x1); // LC_SEGMENT
    assert_eq!(
        read_le_at::<u32>(&image, &mut offset).unwrap(),
        Segment::COMMAND_SIZE_32 + Section::HEADER_SIZE_32
    );
    assert_eq!(read_name_at(&image, &mut offset).unwrap(), "__TEXT");
    assert_eq!(read_le_at::<u32>(&image, &mut offset).unwrap(), 0x1000);
}

#[test]
fn put_big_endian_image() {
    let mut toc = FileToc::new(Magic::MAGIC_64, ByteOrder::BigEndian);
    toc.header.file_type = FileType::Execute;
    toc.add_load(LoadCommand::new(LoadCmd::SYMTAB, vec![0u8; 16]));

    let size = toc.toc_size().unwrap() as usize;
    let mut image = vec![0u8; size];
    toc.put(&mut image).unwrap();

    let mut offset = 0;
    assert_eq!(read_be_at::<u32>(&image, &mut offset).unwrap(), 0xfeed_facf);
    assert_eq!(&image[0..4], &[0xfe, 0xed, 0xfa, 0xcf]);

    offset = FileHeader::SIZE_64 as usize;
    assert_eq!(read_be_at::<u32>(&image, &mut offset).unwrap(), 0x2);
    assert_eq!(read_be_at::<u32>(&image, &mut offset).unwrap(), 24);
}

#[test]
fn buffer_one_byte_short_is_rejected() {
    let toc = build_reference_toc();
    let size = toc.toc_size().unwrap() as usize;

    let mut short = vec![0u8; size - 1];
    assert!(matches!(
        toc.put(&mut short),
        Err(Error::BufferTooSmall { needed, actual })
            if needed == size && actual == size - 1
    ));
}

#[test]
fn derived_copy_shares_identity_only() {
    let toc = build_reference_toc();
    let copy = toc.derived_copy(FileType::Dylib, HeaderFlags::empty());

    assert_eq!(copy.header.magic, Magic::MAGIC_64);
    assert_eq!(copy.byte_order, ByteOrder::LittleEndian);
    assert_eq!(copy.header.file_type, FileType::Dylib);
    assert_eq!(copy.header.ncmds, 0);
    assert_eq!(copy.header.sizeof_cmds, 0);
    assert!(copy.loads().is_empty());
    assert!(copy.sections().is_empty());

    // The copy can be emitted on its own: just a bare header
    let size = copy.toc_size().unwrap() as usize;
    assert_eq!(size as u32, FileHeader::SIZE_64);
    let mut image = vec![0u8; size];
    assert_eq!(copy.put(&mut image).unwrap(), size);
}

#[test]
fn write_file_emits_put_image_prefix() {
    let toc = build_reference_toc();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.bin");

    toc.write_file(&path).unwrap();

    let contents = std::fs::read(&path).unwrap();
    let expected_len = toc.file_size().max(u64::from(toc.toc_size().unwrap()));
    assert_eq!(contents.len() as u64, expected_len);

    let mut image = vec![0u8; toc.toc_size().unwrap() as usize];
    toc.put(&mut image).unwrap();
    assert_eq!(&contents[..image.len()], &image[..]);
}

#[test]
fn snapshot_json_is_stable_for_reference_toc() {
    let toc = build_reference_toc();
    let json = toc.snapshot().to_json().unwrap();

    assert!(json.contains("\"magic\": 4277009103"));
    assert!(json.contains("\"file_type\": \"EXECUTE\""));
    assert!(json.contains("\"name\": \"__TEXT\""));
    assert!(json.contains("\"name\": \"__text\""));
    assert!(json.contains("\"name\": \"LC_UUID\""));

    // Stable: the same TOC snapshots to the same JSON
    assert_eq!(json, toc.snapshot().to_json().unwrap());
}
