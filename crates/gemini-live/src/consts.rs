pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

pub const BASE_URL: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash-exp";

/// MIME type of the PCM16 microphone chunks the service sends upstream.
pub const INPUT_AUDIO_MIME_TYPE: &str = "audio/pcm;rate=16000";
