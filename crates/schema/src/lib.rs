pub mod envelope;
pub mod event;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod programs;
pub mod value;

// Event model
pub use event::{Event, EventSource, SourceKind};

// Program catalog
pub use programs::{
    aggregator_by_address, program_by_address, Aggregator, Category, ProgramId, ProgramInfo,
    AGGREGATORS, PROGRAMS, SYSTEM_PROGRAM, TOKEN_PROGRAM, WSOL_MINT,
};

// Transaction carrier
pub use envelope::{InnerInstructions, Instruction, TokenBalance, TransactionEnvelope};

// Binary layouts
pub use layout::{
    decode_fields, decode_value, ByteReader, EventDef, FieldDef, FieldTy, InstructionDef,
    LayoutError, ProgramSchema,
};

// Pipeline definitions
pub use pipeline::{
    AccountsFilter, AmountRange, Backoff, Condition, Destinations, DiscordDestination, FieldMapping,
    Filter, FilterOp, MessageFormat, Pipeline, PipelineStatus, RetryPolicy, TelegramDestination,
    TemplateKind, Transform, WebhookDestination, WebsocketDestination,
};

// Outputs
pub use output::OutputRecord;

// Values
pub use value::{lookup_path, DataMap, Value};
