/// Engine lifecycle message.
///
/// The set is closed on purpose: payloads are carried by the variant itself,
/// so handlers never need to downcast. A message is created per send and
/// discarded after dispatch; the bus never retains one.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Start,
    EarlyUpdate { dt: f32 },
    Update { dt: f32 },
    LateUpdate { dt: f32 },
    FixedUpdate { fixed_dt: f32 },

    PreRender,
    Render,
    PostRender,
    AfterFrame,

    GameLogicStart,
    GameLogicStop,

    SceneLoaded { scene: String },
    SceneUnloaded { scene: String },

    WindowResize { width: u32, height: u32 },
    Quitting,
}

/// Payload-free discriminant of [`Message`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Start,
    EarlyUpdate,
    Update,
    LateUpdate,
    FixedUpdate,

    PreRender,
    Render,
    PostRender,
    AfterFrame,

    GameLogicStart,
    GameLogicStop,

    SceneLoaded,
    SceneUnloaded,

    WindowResize,
    Quitting,
}

impl Message {
    #[inline]
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Start => MessageKind::Start,
            Message::EarlyUpdate { .. } => MessageKind::EarlyUpdate,
            Message::Update { .. } => MessageKind::Update,
            Message::LateUpdate { .. } => MessageKind::LateUpdate,
            Message::FixedUpdate { .. } => MessageKind::FixedUpdate,
            Message::PreRender => MessageKind::PreRender,
            Message::Render => MessageKind::Render,
            Message::PostRender => MessageKind::PostRender,
            Message::AfterFrame => MessageKind::AfterFrame,
            Message::GameLogicStart => MessageKind::GameLogicStart,
            Message::GameLogicStop => MessageKind::GameLogicStop,
            Message::SceneLoaded { .. } => MessageKind::SceneLoaded,
            Message::SceneUnloaded { .. } => MessageKind::SceneUnloaded,
            Message::WindowResize { .. } => MessageKind::WindowResize,
            Message::Quitting => MessageKind::Quitting,
        }
    }
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Start => "Start",
            MessageKind::EarlyUpdate => "EarlyUpdate",
            MessageKind::Update => "Update",
            MessageKind::LateUpdate => "LateUpdate",
            MessageKind::FixedUpdate => "FixedUpdate",
            MessageKind::PreRender => "PreRender",
            MessageKind::Render => "Render",
            MessageKind::PostRender => "PostRender",
            MessageKind::AfterFrame => "AfterFrame",
            MessageKind::GameLogicStart => "GameLogicStart",
            MessageKind::GameLogicStop => "GameLogicStop",
            MessageKind::SceneLoaded => "SceneLoaded",
            MessageKind::SceneUnloaded => "SceneUnloaded",
            MessageKind::WindowResize => "WindowResize",
            MessageKind::Quitting => "Quitting",
        }
    }
}
