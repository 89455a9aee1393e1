use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tolc_enhancer::codegen::node::MethodNode;
use tolc_enhancer::codegen::opcodes::{ALOAD, GETFIELD};
use tolc_enhancer::codegen::textifier::listing;
use tolc_enhancer::codegen::{assemble_method, ConstantPool, MethodVisitor};
use tolc_enhancer::{rewrite_getter, ClassMeta, Config, EnhanceContext, FieldMeta, JavaType, ReadStrategy};

#[derive(Parser)]
#[command(name = "tolc-enhance")]
#[command(about = "Property getter enhancer for persistence-capable classes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a plain `getXXX` accessor and show the result
    Getter {
        /// Owning class, dotted or internal form
        #[arg(long, value_name = "CLASS")]
        class: String,

        /// Property name
        #[arg(long)]
        field: String,

        /// Java type of the property, e.g. `int` or `java.lang.String`
        #[arg(long = "type", value_name = "TYPE")]
        java_type: String,

        /// Declared field id within the class
        #[arg(long, default_value_t = 0)]
        id: i32,

        /// Nearest persistable superclass
        #[arg(long, requires = "inherited")]
        superclass: Option<String>,

        /// Number of managed fields inherited from persistable ancestors
        #[arg(long, requires = "superclass")]
        inherited: Option<u16>,

        /// Read strategy: normal, check or mediate
        #[arg(long, default_value = "normal")]
        strategy: String,

        /// Instances of the class may be detached
        #[arg(long)]
        detachable: bool,

        /// Notify the detach listener instead of throwing
        #[arg(long)]
        listener: bool,

        /// Emit stack map frames (default: TOLC_EMIT_FRAMES, else on)
        #[arg(long, conflicts_with = "no_frames")]
        frames: bool,

        /// Do not emit stack map frames
        #[arg(long)]
        no_frames: bool,

        /// Log what the enhancer adds
        #[arg(long)]
        debug: bool,

        /// Also print the assembled Code attribute as hex
        #[arg(long)]
        bytes: bool,
    },
}

struct GetterArgs {
    class: String,
    field: String,
    java_type: String,
    id: i32,
    superclass: Option<(String, u16)>,
    strategy: String,
    detachable: bool,
    switches: Switches,
    bytes: bool,
}

/// Command line overrides of the environment configuration
#[derive(Debug, Default, Clone, Copy)]
struct Switches {
    listener: bool,
    frames: Option<bool>,
    debug: bool,
}

impl Switches {
    /// Flags only ever turn a setting on; frames may be forced either way
    fn apply(self, env: Config) -> Config {
        let listener = env.detach_listener || self.listener;
        let debug = env.debug || self.debug;
        let frames = self.frames.unwrap_or(env.emit_frames);
        env.with_detach_listener(listener).with_debug(debug).with_emit_frames(frames)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Getter {
            class,
            field,
            java_type,
            id,
            superclass,
            inherited,
            strategy,
            detachable,
            listener,
            frames,
            no_frames,
            debug,
            bytes,
        } => {
            let superclass = superclass.zip(inherited);
            enhance_getter(GetterArgs {
                class,
                field,
                java_type,
                id,
                superclass,
                strategy,
                detachable,
                switches: Switches {
                    listener,
                    frames: match (frames, no_frames) {
                        (true, _) => Some(true),
                        (_, true) => Some(false),
                        _ => None,
                    },
                    debug,
                },
                bytes,
            })?;
        }
    }

    Ok(())
}

fn enhance_getter(args: GetterArgs) -> Result<()> {
    let java_type = JavaType::from_type_name(&args.java_type)?;
    let strategy: ReadStrategy = args.strategy.parse()?;
    let field = FieldMeta::new(args.field.as_str(), args.id, java_type).with_read_strategy(strategy);

    let mut class = ClassMeta::new(&args.class).with_detachable(args.detachable);
    if let Some((superclass, inherited)) = &args.superclass {
        class = class.with_persistable_superclass(superclass, *inherited);
    }

    let env = Config::from_env().context("reading TOLC_* environment")?;
    let config = args.switches.apply(env);
    init_logging(config.debug);
    let ctx = EnhanceContext::new(class).with_config(config);

    let original = sample_getter(&ctx.class, &field);
    let rewritten = rewrite_getter(&original, &field, &ctx)
        .with_context(|| format!("rewriting {}.{}", ctx.class.internal_name, original.name))?;

    println!("{}", listing(&rewritten.relocated));
    println!("{}", listing(&rewritten.replacement));

    if args.bytes {
        let mut constant_pool = ConstantPool::new();
        let code = assemble_method(&rewritten.replacement, &mut constant_pool, ctx.include_frames())?;
        println!("Code ({} bytes, {} constants):", code.code.len(), constant_pool.count() - 1);
        println!("{}", hex(&code.to_bytes()));
    }

    Ok(())
}

fn init_logging(debug: bool) {
    let level = if debug { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    let _ = env_logger::builder().filter_level(level).try_init();
}

/// `getXXX` that just returns the field, as a compiler would emit it
fn sample_getter(class: &ClassMeta, field: &FieldMeta) -> MethodNode {
    let mut method = MethodNode::new(field.access_flags(), &getter_name(&field.name), &field.getter_descriptor());
    method.visit_code();
    method.visit_var_insn(ALOAD, 0);
    method.visit_field_insn(GETFIELD, &class.internal_name, &field.name, &field.java_type.descriptor());
    method.visit_insn(field.java_type.return_opcode());
    method.visit_maxs(field.java_type.size(), 1);
    method.visit_end();
    method
}

fn getter_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "get".to_string(),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .map(|row| row.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_follow_environment_unless_forced() {
        let env = Config::default().with_emit_frames(false);
        assert!(!Switches::default().apply(env.clone()).emit_frames);

        let forced = Switches { frames: Some(true), ..Switches::default() };
        assert!(forced.apply(env).emit_frames);

        let env = Config::default();
        assert!(Switches::default().apply(env.clone()).emit_frames);
        let suppressed = Switches { frames: Some(false), ..Switches::default() };
        assert!(!suppressed.apply(env).emit_frames);
    }

    #[test]
    fn test_flags_only_enable() {
        let env = Config::default().with_detach_listener(true).with_debug(true);
        let config = Switches::default().apply(env);
        assert!(config.detach_listener);
        assert!(config.debug);

        let config = Switches { listener: true, debug: true, frames: None }.apply(Config::default());
        assert!(config.detach_listener);
        assert!(config.debug);
    }

    #[test]
    fn test_getter_name() {
        assert_eq!(getter_name("age"), "getAge");
        assert_eq!(sample_getter(&ClassMeta::new("a/P"), &FieldMeta::new("id", 0, JavaType::Long)).max_stack, 2);
    }
}
