//! siftool
//!
//! Command-line inspection and modification of SIF container images: dump
//! the global header and descriptors, extract object payloads, and
//! add/delete/promote data objects.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sif::{
    create_container_at_path, load_container_at_path, AddOpts, CreateOpts, DataType, DeleteOpts,
    Descriptor, DescriptorInput, FsType, Link, PartType, SetOpts, VERSION,
};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "siftool")]
#[command(version, about = "Inspect and modify SIF container images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the global header
    Header { file: PathBuf },

    /// List object descriptors
    List { file: PathBuf },

    /// Display detailed information about one descriptor
    Info { id: u32, file: PathBuf },

    /// Write an object's payload to stdout
    Dump { id: u32, file: PathBuf },

    /// Create a new empty image
    New { file: PathBuf },

    /// Add a data object from a file
    Add {
        file: PathBuf,
        input: PathBuf,

        /// Object type: deffile, envvar, labels, partition, signature,
        /// genericjson, generic, cryptomessage, sbom
        #[arg(long, default_value = "generic")]
        datatype: String,

        /// Object name recorded in the descriptor
        #[arg(long)]
        name: Option<String>,

        /// Group id (0 leaves the object ungrouped)
        #[arg(long)]
        groupid: Option<u32>,

        /// Link to another descriptor id
        #[arg(long)]
        link: Option<u32>,

        /// Link to a group id
        #[arg(long)]
        grouplink: Option<u32>,

        /// Start alignment of the object bytes
        #[arg(long)]
        alignment: Option<u64>,

        /// Partition filesystem: squashfs, ext3, archive, raw, encrypted-squashfs
        #[arg(long, default_value = "squashfs")]
        partfs: String,

        /// Partition type: primsys, system, data, overlay
        #[arg(long, default_value = "system")]
        parttype: String,

        /// Partition architecture name, e.g. amd64
        #[arg(long, default_value = "amd64")]
        partarch: String,
    },

    /// Delete an object descriptor and its data
    Del { id: u32, file: PathBuf },

    /// Promote a partition to primary system partition
    Setprim { id: u32, file: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Commands::Header { file } => cmd_header(&file),
        Commands::List { file } => cmd_list(&file),
        Commands::Info { id, file } => cmd_info(id, &file),
        Commands::Dump { id, file } => cmd_dump(id, &file),
        Commands::New { file } => cmd_new(&file),
        Commands::Add {
            file,
            input,
            datatype,
            name,
            groupid,
            link,
            grouplink,
            alignment,
            partfs,
            parttype,
            partarch,
        } => cmd_add(
            &file, &input, &datatype, name, groupid, link, grouplink, alignment, &partfs,
            &parttype, &partarch,
        ),
        Commands::Del { id, file } => cmd_del(id, &file),
        Commands::Setprim { id, file } => cmd_setprim(id, &file),
    }
}

fn cmd_header(path: &PathBuf) -> Result<()> {
    let image = load_container_at_path(path)
        .with_context(|| format!("loading {}", path.display()))?;
    let h = image.header();

    println!("Launch:   {}", h.launch_script().trim_end());
    println!("Version:  {VERSION}");
    println!("Arch:     {}", h.arch());
    println!("ID:       {}", h.id());
    println!("Ctime:    {}", h.created_at());
    println!("Mtime:    {}", h.modified_at());
    println!("Dtotal:   {}", h.descriptors_total());
    println!("Dused:    {}", h.descriptors_used());
    println!("Doff:     {}", h.descriptors_offset());
    println!("Dsize:    {}", h.descriptors_size());
    println!("Dataoff:  {}", h.data_offset());
    println!("Datasize: {}", h.data_size());

    image.unload()?;
    Ok(())
}

fn cmd_list(path: &PathBuf) -> Result<()> {
    let image = load_container_at_path(path)
        .with_context(|| format!("loading {}", path.display()))?;

    println!(
        "{:<4} {:<6} {:<8} {:<24} {:<22} NAME",
        "ID", "GROUP", "LINK", "SIF POSITION (start-end)", "TYPE"
    );
    for d in image.descriptors() {
        println!(
            "{:<4} {:<6} {:<8} {:<24} {:<22} {}",
            d.id(),
            group_field(d),
            link_field(d.link()),
            format!("{}-{}", d.offset(), d.offset() + d.size()),
            type_field(d),
            d.name()
        );
    }

    image.unload()?;
    Ok(())
}

fn cmd_info(id: u32, path: &PathBuf) -> Result<()> {
    let image = load_container_at_path(path)
        .with_context(|| format!("loading {}", path.display()))?;
    let d = image.get_descriptor(id)?;

    println!("Datatype: {}", d.data_type());
    println!("ID:       {}", d.id());
    println!("Group:    {}", group_field(d));
    println!("Link:     {}", link_field(d.link()));
    println!("Fileoff:  {}", d.offset());
    println!("Filelen:  {}", d.size());
    println!("Ctime:    {}", d.created_at());
    println!("Mtime:    {}", d.modified_at());
    println!("Name:     {}", d.name());

    match d.data_type() {
        DataType::Partition => {
            let meta = d.partition_metadata()?;
            println!("Fstype:   {}", meta.fs_type);
            println!("Parttype: {}", meta.part_type);
            println!("Arch:     {}", meta.arch());
        }
        DataType::Signature => {
            let meta = d.signature_metadata()?;
            println!("Hashtype: {}", meta.hash_type);
            println!("Entity:   {}", hex::encode(meta.fingerprint));
        }
        DataType::CryptoMessage => {
            let meta = d.crypto_message_metadata()?;
            println!("Format:   {}", meta.format);
            println!("Message:  {}", meta.kind);
        }
        DataType::Sbom => {
            println!("Format:   {}", d.sbom_format()?);
        }
        _ => {}
    }

    image.unload()?;
    Ok(())
}

fn cmd_dump(id: u32, path: &PathBuf) -> Result<()> {
    let mut image = load_container_at_path(path)
        .with_context(|| format!("loading {}", path.display()))?;
    let data = image.read_object(id)?;
    std::io::stdout().write_all(&data)?;
    image.unload()?;
    Ok(())
}

fn cmd_new(path: &PathBuf) -> Result<()> {
    let image = create_container_at_path(path, CreateOpts::new())
        .with_context(|| format!("creating {}", path.display()))?;
    image.unload()?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_add(
    path: &PathBuf,
    input_path: &PathBuf,
    datatype: &str,
    name: Option<String>,
    groupid: Option<u32>,
    link: Option<u32>,
    grouplink: Option<u32>,
    alignment: Option<u64>,
    partfs: &str,
    parttype: &str,
    partarch: &str,
) -> Result<()> {
    let data_type = parse_data_type(datatype)?;
    let reader = File::open(input_path)
        .with_context(|| format!("opening {}", input_path.display()))?;

    let mut input = DescriptorInput::new(data_type, reader);
    if let Some(name) = name {
        input = input.with_name(&name)?;
    }
    match groupid {
        Some(0) => input = input.ungrouped(),
        Some(gid) => input = input.with_group_id(gid),
        None => {}
    }
    if let Some(id) = link {
        input = input.with_link(Link::Object(id));
    } else if let Some(gid) = grouplink {
        input = input.with_link(Link::Group(gid));
    }
    if let Some(alignment) = alignment {
        input = input.with_alignment(alignment);
    }
    if data_type == DataType::Partition {
        input = input.with_partition_metadata(
            parse_fs_type(partfs)?,
            parse_part_type(parttype)?,
            partarch,
        )?;
    }

    let mut image = load_container_at_path(path)
        .with_context(|| format!("loading {}", path.display()))?;
    image.add_object(input, AddOpts::new())?;
    image.unload()?;
    Ok(())
}

fn cmd_del(id: u32, path: &PathBuf) -> Result<()> {
    let mut image = load_container_at_path(path)
        .with_context(|| format!("loading {}", path.display()))?;
    image.delete_object(id, DeleteOpts::new())?;
    image.unload()?;
    Ok(())
}

fn cmd_setprim(id: u32, path: &PathBuf) -> Result<()> {
    let mut image = load_container_at_path(path)
        .with_context(|| format!("loading {}", path.display()))?;
    image.set_prim_part(id, SetOpts::new())?;
    image.unload()?;
    Ok(())
}

fn group_field(d: &Descriptor) -> String {
    match d.group_id() {
        0 => "NONE".to_string(),
        gid => gid.to_string(),
    }
}

fn link_field(link: Link) -> String {
    match link {
        Link::None => "NONE".to_string(),
        Link::Object(id) => id.to_string(),
        Link::Group(gid) => format!("{gid} (G)"),
    }
}

fn type_field(d: &Descriptor) -> String {
    match d.partition_metadata() {
        Ok(meta) => format!("{} ({}/{}/{})", d.data_type(), meta.fs_type, meta.part_type, meta.arch()),
        Err(_) => d.data_type().to_string(),
    }
}

fn parse_data_type(s: &str) -> Result<DataType> {
    Ok(match s {
        "deffile" => DataType::Deffile,
        "envvar" => DataType::EnvVar,
        "labels" => DataType::Labels,
        "partition" => DataType::Partition,
        "signature" => DataType::Signature,
        "genericjson" => DataType::GenericJson,
        "generic" => DataType::Generic,
        "cryptomessage" => DataType::CryptoMessage,
        "sbom" => DataType::Sbom,
        other => bail!("unknown data type {other:?}"),
    })
}

fn parse_fs_type(s: &str) -> Result<FsType> {
    Ok(match s {
        "squashfs" => FsType::Squash,
        "ext3" => FsType::Ext3,
        "archive" => FsType::ImmutableObject,
        "raw" => FsType::Raw,
        "encrypted-squashfs" => FsType::EncryptedSquash,
        other => bail!("unknown filesystem type {other:?}"),
    })
}

fn parse_part_type(s: &str) -> Result<PartType> {
    Ok(match s {
        "primsys" => PartType::PrimSys,
        "system" => PartType::System,
        "data" => PartType::Data,
        "overlay" => PartType::Overlay,
        other => bail!("unknown partition type {other:?}"),
    })
}
