pub const USER_SCHEMA: &str = r#"
    DEFINE TABLE user SCHEMAFULL;

    DEFINE FIELD first_name ON TABLE user TYPE string;
    DEFINE FIELD last_name ON TABLE user TYPE string;
    DEFINE FIELD email ON TABLE user TYPE string;
    DEFINE FIELD phone_number ON TABLE user TYPE option<string>;
    DEFINE FIELD avatar_url ON TABLE user TYPE option<string>;
    DEFINE FIELD role ON TABLE user TYPE string;
    DEFINE FIELD created_at ON TABLE user TYPE datetime;
    DEFINE FIELD updated_at ON TABLE user TYPE datetime;

    DEFINE INDEX user_email_unique ON TABLE user COLUMNS email UNIQUE;
"#;

pub const CREDENTIAL_SCHEMA: &str = r#"
    DEFINE TABLE credential SCHEMAFULL;

    DEFINE FIELD user_id ON TABLE credential TYPE string;
    DEFINE FIELD password_hash ON TABLE credential TYPE string;
    DEFINE FIELD verified ON TABLE credential TYPE bool DEFAULT false;
    DEFINE FIELD created_at ON TABLE credential TYPE datetime;
    DEFINE FIELD updated_at ON TABLE credential TYPE datetime;

    DEFINE INDEX credential_user_unique ON TABLE credential COLUMNS user_id UNIQUE;
"#;

pub const SESSION_SCHEMA: &str = r#"
    DEFINE TABLE session SCHEMAFULL;

    DEFINE FIELD user_id ON TABLE session TYPE string;
    DEFINE FIELD device_fingerprint ON TABLE session TYPE string;
    DEFINE FIELD refresh_token_hash ON TABLE session TYPE string;
    DEFINE FIELD revoked ON TABLE session TYPE bool DEFAULT false;
    DEFINE FIELD expires_at ON TABLE session TYPE datetime;
    DEFINE FIELD created_at ON TABLE session TYPE datetime;
    DEFINE FIELD updated_at ON TABLE session TYPE datetime;

    DEFINE INDEX session_user_device_unique ON TABLE session COLUMNS user_id, device_fingerprint UNIQUE;
"#;

pub const VERIFICATION_CODE_SCHEMA: &str = r#"
    DEFINE TABLE verification_code SCHEMAFULL;

    DEFINE FIELD kind ON TABLE verification_code TYPE string;
    DEFINE FIELD user_id ON TABLE verification_code TYPE string;
    DEFINE FIELD code ON TABLE verification_code TYPE string;
    DEFINE FIELD consumed ON TABLE verification_code TYPE bool DEFAULT false;
    DEFINE FIELD expires_at ON TABLE verification_code TYPE datetime;
    DEFINE FIELD created_at ON TABLE verification_code TYPE datetime;

    DEFINE INDEX verification_code_lookup ON TABLE verification_code COLUMNS kind, user_id;
"#;

pub const OAUTH_LINK_SCHEMA: &str = r#"
    DEFINE TABLE oauth_link SCHEMAFULL;

    DEFINE FIELD user_id ON TABLE oauth_link TYPE string;
    DEFINE FIELD provider ON TABLE oauth_link TYPE string;
    DEFINE FIELD provider_user_id ON TABLE oauth_link TYPE string;
    DEFINE FIELD created_at ON TABLE oauth_link TYPE datetime;

    DEFINE INDEX oauth_link_provider_unique ON TABLE oauth_link COLUMNS provider, provider_user_id UNIQUE;
"#;
